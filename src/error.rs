//! Unified error types for the delver orchestration core.
//!
//! The error taxonomy deliberately keeps most failures *out* of this module:
//!
//! - Tool execution errors are captured as step-record data inside the
//!   owning agent's loop and never cross it (see [`crate::agent`]).
//! - Step-budget exhaustion and decision-process failures surface as a
//!   [`RunStatus`](crate::agent::RunStatus) on the run result, not as `Err`.
//! - Only configuration problems — invalid budgets, duplicate tool names,
//!   malformed delegation templates, re-assembly — reach this type, and they
//!   do so at construction time, before any task is accepted.

/// Result type alias for delver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the delver orchestration core.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration detected at construction or assembly time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tool boundary error surfaced outside a run (e.g. registry setup).
    #[error("tool error: {0}")]
    Tool(#[from] crate::tool::ToolError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (downloads directory creation).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
