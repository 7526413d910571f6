//! Error types for the tool module.
//!
//! Within an agent's step loop these are recoverable by design: a failed
//! call is recorded in the step's error field and fed back to the model,
//! never raised past the loop.

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Arguments did not match the tool's schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran but failed (timeout, backend error, bad state).
    #[error("execution failed: {0}")]
    Execution(String),

    /// De/serialization of arguments or results failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Create an invalid-arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
}
