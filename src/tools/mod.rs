//! Tool System module.
//!
//! This module defines the `Tool` trait and `ToolRouter` that together
//! form the tool execution framework.
//!
//! Key concepts:
//! - **Tool trait**: every tool provides its name, description, JSON Schema
//!   for parameters, and an execute method over typed arguments
//! - **ToolArgs**: the raw JSON payload from the reasoning service is
//!   normalized once at the router boundary; tools never see untyped values
//! - **ToolRouter**: the registry of available tools and the dispatcher. It
//!   never fails: unknown tools, missing parameters and query failures all
//!   become a `{"erro": ...}` payload the reasoning service can react to

pub mod generation;
pub mod list_dates;
pub mod operation;
pub mod restrictions;
pub mod summary;
pub mod thermal;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::normalize::{non_negative, normalize_integer, normalize_string};
use crate::store::HighlightStore;
use crate::types::ToolDefinition;

/// The single key of every error payload sent back to the service.
pub const ERROR_KEY: &str = "erro";

/// Failures reported to the reasoning service instead of being raised.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool desconhecida: {0}")]
    UnknownTool(String),

    #[error("Parâmetro 'data' é obrigatório (YYYY-MM-DD).")]
    MissingDate,

    #[error("Falha executando tool '{tool}': {message}")]
    Failed { tool: String, message: String },
}

/// Normalized tool arguments.
///
/// Only recognized keys are read; anything else in the payload is ignored.
/// Negative limits are already turned into "no limit" here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    pub date: Option<String>,
    pub submarket: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub unit: Option<String>,
    pub term: Option<String>,
    pub deviation_status: Option<String>,
    pub limit: Option<usize>,
    pub item_limit: Option<usize>,
}

impl ToolArgs {
    /// Normalize a raw payload. Non-object payloads yield no arguments.
    pub fn from_value(raw: &Value) -> Self {
        let text = |key: &str| normalize_string(raw.get(key));
        let count = |key: &str| non_negative(normalize_integer(raw.get(key)));

        Self {
            date: text("data"),
            submarket: text("submercado"),
            kind: text("tipo"),
            status: text("status"),
            unit: text("unidade"),
            term: text("termo"),
            deviation_status: text("desvio_status"),
            limit: count("limite"),
            item_limit: count("limite_itens"),
        }
    }

    pub fn require_date(&self) -> Result<String, ToolError> {
        self.date.clone().ok_or(ToolError::MissingDate)
    }
}

/// Result of one dispatch: data for the service, or an error it can read.
#[derive(Debug)]
pub enum ToolOutcome {
    Success(Value),
    Error(ToolError),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            ToolOutcome::Success(value) => value.clone(),
            ToolOutcome::Error(err) => json!({ ERROR_KEY: err.to_string() }),
        }
    }

    /// Compact JSON text with non-ASCII kept as-is. Equal outcomes always
    /// encode identically.
    pub fn to_wire(&self) -> String {
        self.to_json().to_string()
    }
}

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "buscar_operacao").
    fn name(&self) -> &'static str;

    /// A human-readable description of what this tool does.
    /// The reasoning service reads this to decide when to use the tool.
    fn description(&self) -> &'static str;

    /// JSON Schema describing the tool's input parameters.
    fn parameters_schema(&self) -> Value;

    /// Whether the router must reject calls without a `data` argument.
    fn requires_date(&self) -> bool {
        true
    }

    /// Run the tool. Returning a [`ToolError`] inside the `anyhow::Error`
    /// reports it as-is; any other error is reported as a tool failure.
    async fn execute(&self, args: &ToolArgs) -> Result<Value>;

    /// Convert this tool into a ToolDefinition for sending to the service.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Build an object schema that rejects unknown parameters.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Schema fragment shared by every date-keyed tool.
pub(crate) fn date_property() -> Value {
    json!({ "type": "string", "description": "Data no formato YYYY-MM-DD" })
}

/// Registry and dispatcher for tools.
///
/// Built once at startup and shared read-only by every session.
pub struct ToolRouter {
    tools: Vec<Box<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRouter {
    /// Create a new empty ToolRouter.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            definitions: Vec::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let definition = tool.to_definition();
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => {
                tracing::warn!(tool = tool.name(), "replacing already registered tool");
                self.tools[index] = tool;
                self.definitions[index] = definition;
            }
            None => {
                tracing::debug!(tool = tool.name(), "registered tool");
                self.tools.push(tool);
                self.definitions.push(definition);
            }
        }
    }

    /// Tool catalog for the reasoning service, in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Dispatch a tool call. Never fails; see [`ToolOutcome`].
    pub async fn execute(&self, name: &str, raw_arguments: &Value) -> ToolOutcome {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            tracing::warn!(tool = name, "unknown tool requested");
            return ToolOutcome::Error(ToolError::UnknownTool(name.to_string()));
        };

        let args = ToolArgs::from_value(raw_arguments);
        tracing::debug!(tool = name, ?args, "normalized tool arguments");

        if tool.requires_date() && args.date.is_none() {
            return ToolOutcome::Error(ToolError::MissingDate);
        }

        match tool.execute(&args).await {
            Ok(value) => ToolOutcome::Success(value),
            Err(err) => {
                let err = match err.downcast::<ToolError>() {
                    Ok(tool_err) => tool_err,
                    Err(err) => ToolError::Failed {
                        tool: name.to_string(),
                        message: format!("{err:#}"),
                    },
                };
                tracing::warn!(tool = name, error = %err, "tool call failed");
                ToolOutcome::Error(err)
            }
        }
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a ToolRouter with every IPDO lookup registered.
pub fn create_default_router(store: Arc<dyn HighlightStore>) -> ToolRouter {
    let mut router = ToolRouter::new();
    router.register(Box::new(list_dates::ListDatesTool::new(store.clone())));
    router.register(Box::new(operation::OperationTool::new(store.clone())));
    router.register(Box::new(generation::GenerationTool::new(store.clone())));
    router.register(Box::new(thermal::ThermalTool::new(store.clone())));
    router.register(Box::new(restrictions::RestrictionsTool::new(store.clone())));
    router.register(Box::new(summary::OperationSummaryTool::new(store)));
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn router() -> (Arc<crate::store::memory::MemoryStore>, ToolRouter) {
        let store = Arc::new(fixtures::store());
        let router = create_default_router(store.clone());
        (store, router)
    }

    fn error_message(outcome: &ToolOutcome) -> String {
        outcome.to_json()[ERROR_KEY]
            .as_str()
            .expect("error payload")
            .to_string()
    }

    #[test]
    fn test_tool_args_normalization() {
        let args = ToolArgs::from_value(&json!({
            "data": " 2024-05-10 ",
            "submercado": "",
            "tipo": "Solar",
            "limite": "3",
            "limite_itens": -1,
            "desconhecido": "x"
        }));
        assert_eq!(args.date.as_deref(), Some("2024-05-10"));
        assert_eq!(args.submarket, None);
        assert_eq!(args.kind.as_deref(), Some("Solar"));
        assert_eq!(args.limit, Some(3));
        assert_eq!(args.item_limit, None);

        assert_eq!(ToolArgs::from_value(&json!(["data"])), ToolArgs::default());
        assert_eq!(ToolArgs::from_value(&Value::Null), ToolArgs::default());
    }

    #[test]
    fn test_catalog_is_unique_and_closed() {
        let (_, router) = router();
        assert_eq!(router.definitions().len(), 6);
        let mut names: Vec<_> = router.definitions().iter().map(|d| d.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), router.definitions().len());
        for def in router.definitions() {
            assert_eq!(def.parameters["type"], "object");
            assert_eq!(def.parameters["additionalProperties"], false);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn test_register_replaces_same_name() {
        let (store, mut router) = router();
        router.register(Box::new(list_dates::ListDatesTool::new(store)));
        assert_eq!(router.tools.len(), 6);
        assert_eq!(router.definitions().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported() {
        let (_, router) = router();
        let outcome = router.execute("apagar_banco", &json!({"data": "2024-05-10"})).await;
        assert!(outcome.is_error());
        assert!(error_message(&outcome).contains("apagar_banco"));
    }

    #[tokio::test]
    async fn test_every_date_tool_requires_date() {
        let (_, router) = router();
        let dated: Vec<_> = router
            .definitions()
            .iter()
            .filter(|d| d.parameters["required"].as_array().unwrap().contains(&json!("data")))
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(dated.len(), 5);

        for name in &dated {
            for args in [json!({}), json!({"data": "   "}), json!({"data": null})] {
                let outcome = router.execute(name, &args).await;
                assert_eq!(
                    error_message(&outcome),
                    "Parâmetro 'data' é obrigatório (YYYY-MM-DD).",
                    "tool {name} args {args}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_list_dates_is_the_only_dateless_tool() {
        let (_, router) = router();
        let dateless: Vec<_> = router
            .definitions()
            .iter()
            .filter(|d| d.parameters["required"].as_array().unwrap().is_empty())
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(dateless, vec!["listar_datas"]);
        let outcome = router.execute("listar_datas", &json!({})).await;
        assert_eq!(outcome.to_json(), json!(["2024-05-10", "2024-05-09"]));
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated() {
        let (store, router) = router();
        store.break_store();
        for def in router.definitions() {
            let outcome = router.execute(&def.name, &json!({"data": "2024-05-10"})).await;
            let message = error_message(&outcome);
            assert!(
                message.starts_with(&format!("Falha executando tool '{}'", def.name)),
                "{message}"
            );
            assert!(message.contains("database is unavailable"));
        }
    }

    #[tokio::test]
    async fn test_dispatch_is_total_over_odd_payloads() {
        let (_, router) = router();
        let payloads = [
            json!(null),
            json!(42),
            json!("data=2024-05-10"),
            json!({"data": 20240510}),
            json!({"data": {"ano": 2024}}),
            json!({"data": "2024-05-10", "limite": "muitos"}),
            json!({"data": "2024-05-10", "limite": -5, "limite_itens": 1.7}),
        ];
        let names = ["listar_datas", "buscar_geracao", "buscar_termica", "", "x"];
        for name in names {
            for payload in &payloads {
                let wire = router.execute(name, payload).await.to_wire();
                assert!(serde_json::from_str::<Value>(&wire).is_ok());
            }
        }
    }

    #[tokio::test]
    async fn test_wire_encoding_is_stable() {
        let (_, router) = router();
        let args = json!({"data": "2024-05-10", "termo": "eólic"});
        let first = router.execute("buscar_restricoes", &args).await.to_wire();
        let second = router.execute("buscar_restricoes", &args).await.to_wire();
        assert_eq!(first, second);
        assert!(first.contains("corte eólico"));
        assert_eq!(
            serde_json::from_str::<Value>(&first).unwrap(),
            json!([{"submercado": "Nordeste", "restricao": "corte eólico"}])
        );
    }
}
