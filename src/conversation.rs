//! Conversation state of one question-answering session.
//!
//! The transcript is append-only. A tool result can only be appended for a
//! call id the service requested earlier in the same conversation, at most
//! once, and a call id may only be requested once.

use std::collections::HashSet;
use thiserror::Error;

use crate::types::{ConversationItem, OutputItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("tool result for unknown call id '{0}'")]
    UnknownCallId(String),

    #[error("call id '{0}' already has a result")]
    AlreadyAnswered(String),

    #[error("call id '{0}' was requested twice")]
    DuplicateCallId(String),
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    items: Vec<ConversationItem>,
    requested: HashSet<String>,
    answered: HashSet<String>,
}

impl Conversation {
    /// Start a session with its instructions and the user's question.
    pub fn new(system_prompt: &str, question: &str) -> Self {
        Self {
            items: vec![
                ConversationItem::system(system_prompt),
                ConversationItem::user(question),
            ],
            ..Default::default()
        }
    }

    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Append everything the service returned, in order.
    ///
    /// Call ids are checked before anything is appended, so a rejected
    /// batch leaves the conversation untouched.
    pub fn append_output(&mut self, output: &[OutputItem]) -> Result<(), ConversationError> {
        let mut batch = HashSet::new();
        for call in output.iter().filter_map(OutputItem::as_tool_call) {
            if self.requested.contains(&call.call_id) || !batch.insert(call.call_id.as_str()) {
                return Err(ConversationError::DuplicateCallId(call.call_id.clone()));
            }
        }

        for item in output {
            if let Some(call) = item.as_tool_call() {
                self.requested.insert(call.call_id.clone());
            }
            self.items.push(ConversationItem::Output(item.clone()));
        }
        Ok(())
    }

    /// Append the serialized result of a requested call.
    pub fn push_tool_result(
        &mut self,
        call_id: &str,
        output: String,
    ) -> Result<(), ConversationError> {
        if !self.requested.contains(call_id) {
            return Err(ConversationError::UnknownCallId(call_id.to_string()));
        }
        if !self.answered.insert(call_id.to_string()) {
            return Err(ConversationError::AlreadyAnswered(call_id.to_string()));
        }
        self.items.push(ConversationItem::ToolResult {
            call_id: call_id.to_string(),
            output,
        });
        Ok(())
    }

    /// Requested calls still waiting for a result.
    pub fn pending_calls(&self) -> usize {
        self.requested.len() - self.answered.len()
    }
}
