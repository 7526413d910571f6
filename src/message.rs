//! Conversation transcript types shared between agents and model adapters.
//!
//! An agent's step loop accumulates [`Message`]s and hands them to its
//! [`Model`](crate::model::Model) on every decision. Role labels are an
//! orchestration-side vocabulary; backends that use different labels (e.g.
//! mapping `tool-call` onto `assistant`) remap them with [`RoleConversions`]
//! when serializing the transcript to the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Role of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Standing instructions for the agent.
    System,
    /// The task (or an observation addressed to the agent).
    User,
    /// Model output: plans and final answers.
    Assistant,
    /// A tool invocation emitted by the model.
    ToolCall,
    /// The result of a tool invocation, fed back to the model.
    ToolResponse,
}

impl Role {
    /// The canonical wire label for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolCall => "tool-call",
            Self::ToolResponse => "tool-response",
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this entry.
    pub role: Role,
    /// Entry text. Tool calls carry a rendered `name(arguments)` form.
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool-call message.
    pub fn tool_call(content: impl Into<String>) -> Self {
        Self::new(Role::ToolCall, content)
    }

    /// Create a tool-response message.
    pub fn tool_response(content: impl Into<String>) -> Self {
        Self::new(Role::ToolResponse, content)
    }
}

/// Remapping of role labels for model backends with a different vocabulary.
///
/// The orchestration core always speaks the [`Role`] vocabulary above; a
/// model adapter applies its conversions when building the wire request.
///
/// # Examples
///
/// ```rust,ignore
/// let conversions = RoleConversions::new()
///     .map(Role::ToolCall, Role::Assistant)
///     .map(Role::ToolResponse, Role::User);
/// assert_eq!(conversions.apply(Role::ToolCall), Role::Assistant);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleConversions {
    conversions: HashMap<Role, Role>,
}

impl RoleConversions {
    /// Create an empty (identity) conversion table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `from` onto `to` when serializing.
    #[must_use]
    pub fn map(mut self, from: Role, to: Role) -> Self {
        self.conversions.insert(from, to);
        self
    }

    /// Resolve the wire role for an orchestration-side role.
    #[must_use]
    pub fn apply(&self, role: Role) -> Role {
        self.conversions.get(&role).copied().unwrap_or(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_conversions() {
        let conv = RoleConversions::new();
        assert_eq!(conv.apply(Role::ToolCall), Role::ToolCall);
        assert_eq!(conv.apply(Role::System), Role::System);
    }

    #[test]
    fn remaps_tool_roles() {
        let conv = RoleConversions::new()
            .map(Role::ToolCall, Role::Assistant)
            .map(Role::ToolResponse, Role::User);
        assert_eq!(conv.apply(Role::ToolCall), Role::Assistant);
        assert_eq!(conv.apply(Role::ToolResponse), Role::User);
        assert_eq!(conv.apply(Role::Assistant), Role::Assistant);
    }

    #[test]
    fn role_labels() {
        assert_eq!(Role::ToolResponse.as_str(), "tool-response");
        assert_eq!(Role::System.as_str(), "system");
    }
}
