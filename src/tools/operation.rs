//! Operation highlights of a date, optionally narrowed to one submarket.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{date_property, object_schema, Tool, ToolArgs};
use crate::queries::{self, OperationQuery};
use crate::store::HighlightStore;

pub struct OperationTool {
    store: Arc<dyn HighlightStore>,
}

impl OperationTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OperationTool {
    fn name(&self) -> &'static str {
        "buscar_operacao"
    }

    fn description(&self) -> &'static str {
        "Busca destaques da operação por data: carga, restrições, transferência de energia \
         e geração de cada submercado. Opcionalmente filtra por submercado \
         (ex: 'Nordeste', 'Sudeste', 'Sul', 'Norte')."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "data": date_property(),
                "submercado": {
                    "type": "string",
                    "description": "Filtro opcional por submercado (contém, sem diferenciar maiúsculas)"
                }
            }),
            &["data"],
        )
    }

    async fn execute(&self, args: &ToolArgs) -> Result<Value> {
        let query = OperationQuery {
            date: args.require_date()?,
            submarket: args.submarket.clone(),
        };
        let items = queries::operation(self.store.as_ref(), &query).await?;
        Ok(serde_json::to_value(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn tool() -> OperationTool {
        OperationTool::new(Arc::new(fixtures::store()))
    }

    #[tokio::test]
    async fn test_filters_by_submarket() {
        let result = tool()
            .execute(&ToolArgs::from_value(&json!({"data": fixtures::DATE, "submercado": "NORDESTE"})))
            .await
            .unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["submercado"], "Nordeste");
        assert_eq!(items[0]["restricoes"][1], "corte eólico");
    }

    #[tokio::test]
    async fn test_missing_date_is_a_tool_error() {
        let err = tool().execute(&ToolArgs::default()).await.unwrap_err();
        assert!(err.downcast_ref::<crate::tools::ToolError>().is_some());
    }
}
