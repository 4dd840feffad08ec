//! Generation highlights by date, submarket, type and status.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{date_property, object_schema, Tool, ToolArgs};
use crate::queries::{self, GenerationQuery};
use crate::store::HighlightStore;

pub struct GenerationTool {
    store: Arc<dyn HighlightStore>,
}

impl GenerationTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GenerationTool {
    fn name(&self) -> &'static str {
        "buscar_geracao"
    }

    fn description(&self) -> &'static str {
        "Busca destaques de geração por data, com filtros opcionais de submercado, tipo e status. \
         Use quando o usuário perguntar sobre 'eólica', 'solar', 'hidráulica' etc."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "data": date_property(),
                "submercado": {
                    "type": "string",
                    "description": "Filtro opcional (nome exato do submercado, ex: 'Nordeste')"
                },
                "tipo": {
                    "type": "string",
                    "description": "Filtro opcional (Hidráulica, Térmica, Eólica, Solar, Nuclear)"
                },
                "status": {
                    "type": "string",
                    "description": "Filtro opcional (Acima, Inferior, Sem desvio, etc.)"
                },
                "limite": {
                    "type": "integer",
                    "description": "Máximo de itens a retornar (opcional)"
                }
            }),
            &["data"],
        )
    }

    async fn execute(&self, args: &ToolArgs) -> Result<Value> {
        let query = GenerationQuery {
            date: args.require_date()?,
            submarket: args.submarket.clone(),
            kind: args.kind.clone(),
            status: args.status.clone(),
            limit: args.limit,
        };
        let items = queries::generation(self.store.as_ref(), &query).await?;
        Ok(serde_json::to_value(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[tokio::test]
    async fn test_solar_above() {
        let tool = GenerationTool::new(Arc::new(fixtures::store()));
        let args = ToolArgs::from_value(&json!({
            "data": fixtures::DATE,
            "tipo": "Solar",
            "status": "ACIMA"
        }));
        let result = tool.execute(&args).await.unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i["tipo"] == "Solar"));
    }

    #[tokio::test]
    async fn test_negative_limit_means_unlimited() {
        let tool = GenerationTool::new(Arc::new(fixtures::store()));
        let args = ToolArgs::from_value(&json!({"data": fixtures::DATE, "limite": -1}));
        let result = tool.execute(&args).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 6);
    }
}
