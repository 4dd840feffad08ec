//! Reasoning-service client module.
//!
//! This module defines the `LlmProvider` trait that abstracts over the
//! external reasoning service, and provides the concrete implementation
//! used in production.
//!
//! Key concepts:
//! - **Explicit handle**: the provider is built once in `main` and passed
//!   to the agent; there is no global client
//! - **Items in, items out**: a request carries the whole conversation and
//!   the tool catalog, a response is the ordered list of items the service
//!   produced (messages, tool calls, and anything else it wants back)
//! - **Retry policy**: transient failures are retried by the provider
//!   according to an explicit [`retry::RetryPolicy`] value

pub mod openai_responses;
pub mod retry;

#[cfg(test)]
pub mod scripted;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ModelRequest, ModelResponse};

/// Trait that all reasoning-service providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and tool catalog, wait for the full response.
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse>;

    /// Return the provider's display name (for logging).
    fn name(&self) -> &str;
}
