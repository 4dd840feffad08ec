//! Agent Loop - the orchestrator of one question-answering session.
//!
//! The Agent mediates between the user, the reasoning service and the
//! IPDO lookup tools:
//!
//! ```text
//! Question
//!     |
//!     v
//! +-----------+     +-----+     +-------+
//! | Reasoning |<--->|Agent|<--->| Tools |
//! |  service  |     +-----+     +-------+
//! +-----------+        |
//!                      v
//!                Final answer
//! ```
//!
//! Each turn sends the whole conversation plus the tool catalog. If the
//! service asks for tools, they run (concurrently) and their results are
//! appended in the order they were requested; otherwise the turn's text is
//! the answer. The loop stops after a fixed number of turns.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::conversation::Conversation;
use crate::llm::LlmProvider;
use crate::tools::{ToolOutcome, ToolRouter};
use crate::types::{ModelRequest, ModelResponse, OutputItem, ToolCall, ToolChoice};

pub const UNINTERPRETABLE_MESSAGE: &str = "Não foi possível interpretar a resposta do modelo.";
pub const EXHAUSTED_MESSAGE: &str =
    "Não foi possível completar a solicitação (muitas iterações de ferramenta).";
pub const SERVICE_FAILURE_MESSAGE: &str =
    "Não foi possível obter uma resposta do modelo no momento. Tente novamente.";

/// Knobs of the agent loop.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub system_prompt: String,
    pub max_turns: u32,
    pub max_output_tokens: u32,
    /// Deadline for each turn's call to the reasoning service, retries included
    pub turn_deadline: Duration,
    pub utc_offset_hours: i32,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            model: config.llm.model.clone(),
            system_prompt: config.system_prompt()?,
            max_turns: config.agent.max_turns.max(1),
            max_output_tokens: config.llm.max_output_tokens,
            turn_deadline: config.turn_deadline(),
            utc_offset_hours: config.agent.utc_offset_hours,
        })
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answered(String),
    /// The service stopped asking for tools but produced no text.
    Uninterpretable,
    /// The turn budget ran out while tools were still being requested.
    Exhausted,
}

impl Outcome {
    pub fn into_text(self) -> String {
        match self {
            Outcome::Answered(text) => text,
            Outcome::Uninterpretable => UNINTERPRETABLE_MESSAGE.to_string(),
            Outcome::Exhausted => EXHAUSTED_MESSAGE.to_string(),
        }
    }
}

/// Everything a finished session produced.
#[derive(Debug)]
pub struct Session {
    pub conversation: Conversation,
    pub outcome: Outcome,
    /// Calls made to the reasoning service
    pub turns: u32,
    /// Tool calls dispatched
    pub dispatches: usize,
}

/// The Agent holds the shared components. It keeps no per-question state,
/// so one instance can serve any number of sessions.
pub struct Agent {
    llm: Arc<dyn LlmProvider>,
    tool_router: ToolRouter,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(llm: Arc<dyn LlmProvider>, tool_router: ToolRouter, settings: AgentSettings) -> Self {
        Self {
            llm,
            tool_router,
            settings,
        }
    }

    /// Answer a question. Never fails: service errors become a fixed
    /// apology after being logged.
    pub async fn answer(&self, question: &str) -> String {
        match self.run(question).await {
            Ok(session) => session.outcome.into_text(),
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "session failed");
                SERVICE_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Run one session to completion.
    pub async fn run(&self, question: &str) -> Result<Session> {
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let span = tracing::info_span!("session", id = %id);
        let now = Utc::now().with_timezone(&offset(self.settings.utc_offset_hours));
        let stamped = stamp_question(question, &now);

        self.run_session(&stamped).instrument(span).await
    }

    async fn run_session(&self, stamped: &str) -> Result<Session> {
        tracing::info!(provider = self.llm.name(), "question received");
        let mut session = Session {
            conversation: Conversation::new(&self.settings.system_prompt, stamped),
            outcome: Outcome::Exhausted,
            turns: 0,
            dispatches: 0,
        };

        for turn in 1..=self.settings.max_turns {
            session.turns = turn;
            let response = self.send(&session.conversation, turn).await?;
            session
                .conversation
                .append_output(&response.output)
                .context("Reasoning service returned an inconsistent transcript")?;

            let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                session.outcome = final_outcome(&response);
                tracing::info!(
                    turn,
                    dispatches = session.dispatches,
                    items = session.conversation.len(),
                    "session answered"
                );
                return Ok(session);
            }

            let discarded = response.message_text();
            if !discarded.is_empty() {
                tracing::debug!(turn, text = %discarded, "text alongside tool calls ignored");
            }

            let outcomes = self.dispatch(&calls).await;
            for (call, outcome) in calls.iter().zip(outcomes) {
                session
                    .conversation
                    .push_tool_result(&call.call_id, outcome.to_wire())?;
            }
            session.dispatches += calls.len();

            let pending = session.conversation.pending_calls();
            if pending > 0 {
                bail!("{pending} tool calls left without a result");
            }
        }

        tracing::warn!(
            turns = session.turns,
            dispatches = session.dispatches,
            "turn budget exhausted"
        );
        Ok(session)
    }

    async fn send(&self, conversation: &Conversation, turn: u32) -> Result<ModelResponse> {
        let request = ModelRequest {
            model: &self.settings.model,
            input: conversation.items(),
            tools: self.tool_router.definitions(),
            tool_choice: ToolChoice::Auto,
            max_output_tokens: self.settings.max_output_tokens,
        };
        tracing::info!(turn, items = request.input.len(), "calling reasoning service");

        let deadline = self.settings.turn_deadline;
        let response = tokio::time::timeout(deadline, self.llm.respond(&request))
            .await
            .map_err(|_| {
                anyhow!(
                    "Reasoning service did not answer within {}s",
                    deadline.as_secs_f64()
                )
            })?
            .with_context(|| format!("Reasoning service call failed on turn {turn}"))?;

        let kinds: Vec<&str> = response.output.iter().map(OutputItem::kind).collect();
        tracing::debug!(
            turn,
            status = response.status.as_deref().unwrap_or("-"),
            items = ?kinds,
            "reasoning service responded"
        );
        Ok(response)
    }

    /// Run every call of a turn concurrently; outcomes keep request order.
    async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        join_all(calls.iter().map(|call| async move {
            let arguments = call.parsed_arguments();
            tracing::info!(tool = %call.name, call_id = %call.call_id, args = %arguments, "tool call");
            let outcome = self.tool_router.execute(&call.name, &arguments).await;
            if outcome.is_error() {
                tracing::warn!(tool = %call.name, result = %outcome.to_wire(), "tool returned an error");
            }
            outcome
        }))
        .await
    }
}

/// Answer text of a turn without tool calls.
fn final_outcome(response: &ModelResponse) -> Outcome {
    let text = response.output_text.trim();
    if !text.is_empty() {
        return Outcome::Answered(text.to_string());
    }
    let fragments = response.message_text();
    if !fragments.is_empty() {
        tracing::debug!("answer taken from message fragments");
        return Outcome::Answered(fragments);
    }
    tracing::warn!("final response carried no text");
    Outcome::Uninterpretable
}

fn offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Prefix the question with the current local time.
pub fn stamp_question(question: &str, now: &DateTime<FixedOffset>) -> String {
    format!("[AGORA={}] {}", now.format("%Y-%m-%d %H:%M:%S"), question.trim())
}
