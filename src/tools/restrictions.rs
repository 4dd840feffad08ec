//! Restrictions reported in the operation highlights, one item each.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{date_property, object_schema, Tool, ToolArgs};
use crate::queries::{self, RestrictionsQuery};
use crate::store::HighlightStore;

pub struct RestrictionsTool {
    store: Arc<dyn HighlightStore>,
}

impl RestrictionsTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RestrictionsTool {
    fn name(&self) -> &'static str {
        "buscar_restricoes"
    }

    fn description(&self) -> &'static str {
        "Busca restrições/limitações reportadas na operação por data, com filtros opcionais \
         de submercado e termo (ex: 'eólica', 'solar', 'frequência')."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "data": date_property(),
                "submercado": {
                    "type": "string",
                    "description": "Filtro opcional por submercado (contém)"
                },
                "termo": {
                    "type": "string",
                    "description": "Filtro opcional por palavra/trecho (contém)"
                },
                "limite": {
                    "type": "integer",
                    "description": "Máximo de itens (opcional)"
                }
            }),
            &["data"],
        )
    }

    async fn execute(&self, args: &ToolArgs) -> Result<Value> {
        let query = RestrictionsQuery {
            date: args.require_date()?,
            submarket: args.submarket.clone(),
            term: args.term.clone(),
            limit: args.limit,
        };
        let items = queries::restrictions(self.store.as_ref(), &query).await?;
        Ok(serde_json::to_value(items)?)
    }
}
