//! Compact per-submarket summary of a date.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{date_property, object_schema, Tool, ToolArgs};
use crate::queries::{self, SummaryQuery};
use crate::store::HighlightStore;

pub struct OperationSummaryTool {
    store: Arc<dyn HighlightStore>,
}

impl OperationSummaryTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OperationSummaryTool {
    fn name(&self) -> &'static str {
        "buscar_operacao_resumo"
    }

    fn description(&self) -> &'static str {
        "Busca um RESUMO compacto da operação por data (menos texto e mais previsível). \
         Retorna por submercado: carga_status, transferencia_status, contagem de restrições, \
         amostra de restrições e lista curta de geração (tipo+status). \
         Use por padrão quando o usuário perguntar 'como estava o sistema no dia X?'."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(
            json!({
                "data": date_property(),
                "submercado": {
                    "type": "string",
                    "description": "Filtro opcional por submercado (contém)"
                },
                "limite_itens": {
                    "type": "integer",
                    "description": "Limita tamanho de listas internas (opcional)"
                }
            }),
            &["data"],
        )
    }

    async fn execute(&self, args: &ToolArgs) -> Result<Value> {
        let query = SummaryQuery {
            date: args.require_date()?,
            submarket: args.submarket.clone(),
            item_limit: args.item_limit,
        };
        let items = queries::operation_summary(self.store.as_ref(), &query).await?;
        Ok(serde_json::to_value(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    #[tokio::test]
    async fn test_summary_with_item_limit() {
        let tool = OperationSummaryTool::new(Arc::new(fixtures::store()));
        let args = ToolArgs::from_value(&json!({
            "data": fixtures::DATE,
            "submercado": "nordeste",
            "limite_itens": 1
        }));
        let result = tool.execute(&args).await.unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["restricoes_qtd"], 2);
        assert_eq!(items[0]["restricoes_amostra"], json!(["frequência baixa"]));
        assert_eq!(items[0]["carga_status"], "Normal");
    }
}
