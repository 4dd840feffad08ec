//! Core data types used throughout ipdo-agent.
//!
//! This module defines the conversation items, tool call structures,
//! and request/response formats that flow between the agent, the
//! reasoning service and the tools.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// --- Message Roles ---

/// The role of a message the agent itself writes into the conversation.
///
/// Assistant output never uses this type: whatever the reasoning service
/// returns is kept verbatim as an [`OutputItem`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

// --- Tool Call ---

/// A tool call requested by the reasoning service.
///
/// `arguments` is the raw JSON text exactly as the service produced it;
/// it is only parsed when the call is dispatched. `call_id` correlates the
/// eventual tool result with this request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    /// Provider fields we don't interpret (item id, status, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
            extra: Map::new(),
        }
    }

    /// Parse the argument payload. A blank or malformed payload becomes
    /// an empty object so a bad call degrades instead of failing the turn.
    pub fn parsed_arguments(&self) -> Value {
        if self.arguments.trim().is_empty() {
            return Value::Object(Map::new());
        }
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

// --- Tool Definition ---

/// Describes a tool's interface to the reasoning service via JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters
    pub parameters: Value,
}

// --- Output Items ---

/// One fragment of an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    pub fn output_text(text: impl Into<String>) -> Self {
        Self {
            kind: "output_text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    fn is_text(&self) -> bool {
        self.kind == "output_text" || self.kind == "text"
    }
}

/// An assistant message returned by the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageItem {
    #[serde(default = "default_assistant_role")]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_assistant_role() -> String {
    "assistant".to_string()
}

/// An item returned by the reasoning service.
///
/// Messages and function calls are understood by the agent; everything
/// else (reasoning traces, web search calls, ...) is carried as raw JSON
/// and sent back untouched on the next turn.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Message(MessageItem),
    FunctionCall(ToolCall),
    Other(Value),
}

impl OutputItem {
    /// Shorthand for an assistant text message.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        OutputItem::Message(MessageItem {
            role: default_assistant_role(),
            content: vec![ContentPart::output_text(text)],
            extra: Map::new(),
        })
    }

    /// Decode a wire item, dispatching on its `type` field.
    ///
    /// A message or function call that doesn't match the expected shape is
    /// kept as `Other`, so it still goes back to the service unmodified.
    pub fn from_value(value: Value) -> Self {
        let decoded = match value.get("type").and_then(Value::as_str) {
            Some("message") => serde_json::from_value(strip_type(value.clone()))
                .map(OutputItem::Message),
            Some("function_call") => serde_json::from_value(strip_type(value.clone()))
                .map(OutputItem::FunctionCall),
            _ => return OutputItem::Other(value),
        };
        decoded.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "undecodable output item passed through as-is");
            OutputItem::Other(value)
        })
    }

    /// Encode back to the wire shape the service produced.
    pub fn to_value(&self) -> Value {
        match self {
            OutputItem::Message(message) => with_type("message", message),
            OutputItem::FunctionCall(call) => with_type("function_call", call),
            OutputItem::Other(value) => value.clone(),
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            OutputItem::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            OutputItem::Message(_) => "message",
            OutputItem::FunctionCall(_) => "function_call",
            OutputItem::Other(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}

fn strip_type(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("type");
    }
    value
}

fn with_type<T: Serialize>(kind: &str, body: &T) -> Value {
    let mut value = serde_json::to_value(body).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut value {
        map.insert("type".to_string(), Value::String(kind.to_string()));
    }
    value
}

// --- Conversation Items ---

/// A single entry in the conversation sent to the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationItem {
    /// Instruction or question written by the agent.
    Message { role: Role, content: String },
    /// Anything the service returned, kept verbatim.
    Output(OutputItem),
    /// Serialized result of a dispatched tool call.
    ToolResult { call_id: String, output: String },
}

impl ConversationItem {
    pub fn system(content: impl Into<String>) -> Self {
        ConversationItem::Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ConversationItem::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            ConversationItem::Output(item) => item.as_tool_call(),
            _ => None,
        }
    }
}

// --- Model Request / Response ---

/// How the service may pick tools. The agent always lets it decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// A request to send to the reasoning service.
///
/// Borrowed from the conversation so a turn never copies the transcript
/// just to build a request.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub input: &'a [ConversationItem],
    pub tools: &'a [ToolDefinition],
    pub tool_choice: ToolChoice,
    pub max_output_tokens: u32,
}

/// The response from one call to the reasoning service.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub id: Option<String>,
    pub status: Option<String>,
    /// Ordered items exactly as the service returned them
    pub output: Vec<OutputItem>,
    /// Convenience flattening of message text; may be empty even when
    /// message items exist
    pub output_text: String,
}

impl ModelResponse {
    /// Tool calls in the order the service requested them.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.output.iter().filter_map(OutputItem::as_tool_call).collect()
    }

    /// Non-empty text fragments of every message item, joined by newlines.
    pub fn message_text(&self) -> String {
        let mut fragments = Vec::new();
        for item in &self.output {
            if let OutputItem::Message(message) = item {
                for part in &message.content {
                    if !part.is_text() {
                        continue;
                    }
                    if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
                        fragments.push(text);
                    }
                }
            }
        }
        fragments.join("\n").trim().to_string()
    }
}
