//! OpenAI Responses API provider implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::retry::{is_retryable_status, with_retry, AttemptError, RetryPolicy};
use super::LlmProvider;
use crate::types::{ConversationItem, ModelRequest, ModelResponse, OutputItem, ToolChoice};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiResponsesProvider {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

// --- API Request Types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    tool_choice: ToolChoice,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct ApiTool<'a> {
    r#type: &'static str,
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

// --- API Response Types ---

#[derive(Deserialize, Debug)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
    #[serde(default)]
    output_text: Option<String>,
}

// --- Implementation ---

impl OpenAiResponsesProvider {
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            client,
            retry,
        })
    }

    fn build_api_request<'a>(&self, request: &ModelRequest<'a>) -> ApiRequest<'a> {
        let input = request.input.iter().map(item_to_wire).collect();

        let tools = request
            .tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function",
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            })
            .collect();

        ApiRequest {
            model: request.model,
            input,
            tools,
            tool_choice: request.tool_choice,
            max_output_tokens: request.max_output_tokens,
        }
    }

    fn parse_response(&self, api_response: ApiResponse) -> ModelResponse {
        let output: Vec<OutputItem> = api_response
            .output
            .into_iter()
            .map(OutputItem::from_value)
            .collect();

        ModelResponse {
            id: api_response.id,
            status: api_response.status,
            output,
            output_text: api_response.output_text.unwrap_or_default(),
        }
    }
}

/// Wire shape of one conversation entry.
fn item_to_wire(item: &ConversationItem) -> Value {
    match item {
        ConversationItem::Message { role, content } => json!({
            "role": role.as_str(),
            "content": content,
        }),
        ConversationItem::Output(output) => output.to_value(),
        ConversationItem::ToolResult { call_id, output } => json!({
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiResponsesProvider {
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        let api_request = self.build_api_request(request);
        let url = format!("{}/responses", self.api_base.trim_end_matches('/'));
        tracing::debug!(
            url = %url,
            items = api_request.input.len(),
            tools = api_request.tools.len(),
            "sending request"
        );

        let (url, api_request) = (&url, &api_request);
        let api_response: ApiResponse = with_retry(&self.retry, self.name(), move || async move {
            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(api_request)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))
                .map_err(AttemptError::Retryable)?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                let err = anyhow::anyhow!("API error ({}): {}", status, error_body);
                return Err(if is_retryable_status(status) {
                    AttemptError::Retryable(err)
                } else {
                    AttemptError::Fatal(err)
                });
            }

            response
                .json::<ApiResponse>()
                .await
                .context("Failed to parse API response")
                .map_err(AttemptError::Fatal)
        })
        .await?;

        tracing::debug!(
            id = api_response.id.as_deref().unwrap_or("-"),
            status = api_response.status.as_deref().unwrap_or("-"),
            items = api_response.output.len(),
            "received response"
        );
        Ok(self.parse_response(api_response))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
