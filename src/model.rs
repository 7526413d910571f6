//! The model boundary — the only capability the orchestration core requires
//! of a language-model collaborator.
//!
//! The core is agnostic to which provider implements [`Model`]: it hands the
//! accumulated transcript and the available tool definitions to
//! [`Model::decide`] and acts on the returned [`Decision`]. Adapters own all
//! wire concerns, including role-label remapping via
//! [`RoleConversions`](crate::message::RoleConversions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::tool::ToolDefinition;

/// What the agent is asking the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Select the next action: a tool call or a terminal final answer.
    Action,
    /// Re-plan: reconsider the remaining approach given everything observed
    /// so far. Issued at the agent's planning interval, before action
    /// selection, and does not consume a step-budget slot.
    Plan,
}

/// Context handed to the model for one decision.
#[derive(Debug)]
pub struct DecisionRequest<'a> {
    /// Whether an action or a plan is expected.
    pub kind: RequestKind,
    /// Ordered transcript accumulated so far, oldest first.
    pub transcript: &'a [Message],
    /// Definitions of every capability the agent may invoke.
    pub tools: &'a [ToolDefinition],
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the capability to invoke.
    pub name: String,
    /// JSON arguments matching the tool's schema.
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Create a tool call request.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The model's answer to a [`DecisionRequest`].
#[derive(Debug, Clone)]
pub enum Decision {
    /// Invoke a tool and observe its result.
    CallTool(ToolCallRequest),
    /// Terminal answer; the run completes.
    FinalAnswer(Value),
    /// An updated plan, expected only for [`RequestKind::Plan`] requests.
    Plan(String),
}

/// Error from the model collaborator.
///
/// Any `ModelError` is fatal for the current run: the agent cannot produce
/// further actions and reports [`RunStatus::Failed`](crate::agent::RunStatus)
/// with the error message. It never crashes the process.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The backend is unreachable or returned an unrecoverable error.
    #[error("model backend unavailable: {0}")]
    Unavailable(String),
    /// The backend responded with something the adapter cannot interpret.
    #[error("malformed model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Create an unavailable-backend error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a malformed-response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// The decision capability an agent requires of its model collaborator.
#[async_trait]
pub trait Model: Send + Sync {
    /// Decide the next action (or plan) given the accumulated context.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when the backend cannot produce a decision;
    /// the owning run then ends with status `Failed`.
    async fn decide(&self, request: DecisionRequest<'_>) -> Result<Decision, ModelError>;
}
