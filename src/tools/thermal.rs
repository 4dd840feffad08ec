//! Thermal units with generation deviations, largest deviation first.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{date_property, object_schema, Tool, ToolArgs};
use crate::queries::{self, ThermalQuery};
use crate::store::HighlightStore;

pub struct ThermalTool {
    store: Arc<dyn HighlightStore>,
}

impl ThermalTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ThermalTool {
    fn name(&self) -> &'static str {
        "buscar_termica"
    }

    fn description(&self) -> &'static str {
        "Busca destaques de geração térmica por data, ordenados pelo maior desvio (MW). \
         Pode limitar a quantidade e filtrar por unidade, termo na descrição ou status do desvio."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "data": date_property(),
                "limite": {
                    "type": "integer",
                    "description": "Máximo de itens (opcional)"
                },
                "unidade": {
                    "type": "string",
                    "description": "Filtrar por unidade_geradora (contém, opcional)"
                },
                "termo": {
                    "type": "string",
                    "description": "Filtrar por palavra na descrição (contém, opcional)"
                },
                "desvio_status": {
                    "type": "string",
                    "description": "Filtro opcional: Acima | Abaixo | Sem desvio"
                }
            }),
            &["data"],
        )
    }

    async fn execute(&self, args: &ToolArgs) -> Result<Value> {
        let query = ThermalQuery {
            date: args.require_date()?,
            limit: args.limit,
            unit: args.unit.clone(),
            term: args.term.clone(),
            deviation_status: args.deviation_status.clone(),
        };
        let items = queries::thermal(self.store.as_ref(), &query).await?;
        Ok(serde_json::to_value(items)?)
    }
}
