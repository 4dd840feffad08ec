//! Lists the report dates available in the store.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{object_schema, Tool, ToolArgs};
use crate::queries;
use crate::store::HighlightStore;

pub struct ListDatesTool {
    store: Arc<dyn HighlightStore>,
}

impl ListDatesTool {
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDatesTool {
    fn name(&self) -> &'static str {
        "listar_datas"
    }

    fn description(&self) -> &'static str {
        "Lista as datas disponíveis no banco IPDO, da mais recente para a mais antiga."
    }

    fn parameters_schema(&self) -> Value {
        object_schema(json!({}), &[])
    }

    fn requires_date(&self) -> bool {
        false
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<Value> {
        let dates = queries::available_dates(self.store.as_ref()).await?;
        Ok(json!(dates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let tool = ListDatesTool::new(Arc::new(MemoryStore::default()));
        let result = tool.execute(&ToolArgs::default()).await.unwrap();
        assert_eq!(result, json!([]));
    }

    #[test]
    fn test_metadata() {
        let tool = ListDatesTool::new(Arc::new(MemoryStore::default()));
        assert_eq!(tool.name(), "listar_datas");
        let schema = tool.parameters_schema();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }
}
