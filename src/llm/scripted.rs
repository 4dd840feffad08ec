//! Test-only provider that replays queued responses.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::LlmProvider;
use crate::types::{ConversationItem, ModelResponse, ModelRequest, OutputItem, ToolCall};

/// One scripted reply.
pub enum Step {
    Respond(ModelResponse),
    Fail(String),
    Stall(Duration),
}

/// Replays `Step`s in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<ConversationItem>>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The conversation as it was sent on call `index`.
    pub fn request(&self, index: usize) -> Vec<ConversationItem> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.input.to_vec());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => bail!(message),
            Some(Step::Stall(duration)) => {
                tokio::time::sleep(duration).await;
                bail!("stalled")
            }
            None => bail!("script exhausted"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Response carrying only the given tool calls.
pub fn calls(calls: &[(&str, &str, &str)]) -> ModelResponse {
    ModelResponse {
        status: Some("completed".into()),
        output: calls
            .iter()
            .map(|(id, name, args)| OutputItem::FunctionCall(ToolCall::new(*id, *name, *args)))
            .collect(),
        ..Default::default()
    }
}

/// Response with one message whose text also fills `output_text`.
pub fn text(answer: &str) -> ModelResponse {
    ModelResponse {
        status: Some("completed".into()),
        output: vec![OutputItem::assistant_text(answer)],
        output_text: answer.to_string(),
        ..Default::default()
    }
}
