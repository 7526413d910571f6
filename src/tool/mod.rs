//! Tool traits and dynamic dispatch for agent capabilities.
//!
//! [`Tool`] is the typed interface a capability implements; [`ToolDyn`] is
//! its object-safe erasure, obtained for free through a blanket impl. Agents
//! hold [`BoxedTool`]s in a [`ToolRegistry`] and resolve them by name once
//! per call — the loop never branches on concrete tool identity.

pub mod errors;
pub mod registry;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use errors::ToolError;
pub use registry::ToolRegistry;

/// Side-effect class of a capability.
///
/// Part of the tool descriptor so an assembly can reason about what an
/// agent is allowed to trigger (e.g. filesystem downloads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SideEffect {
    /// No externally visible state changes.
    #[default]
    ReadOnly,
    /// Mutates shared state: browsing session, filesystem, sub-agent runs.
    Mutating,
}

/// Schema-level description of a capability, shown to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Unique name within the owning agent's registry.
    pub name: String,
    /// What the tool does and when to use it.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
    /// Side-effect class.
    pub side_effect: SideEffect,
}

/// Typed interface for a named, schema-described capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    const NAME: &'static str;
    /// Deserialized argument type.
    type Args: DeserializeOwned + Send;
    /// Result type, serialized into the tool result.
    type Output: Serialize;
    /// Error type for failed calls.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The tool's name (defaults to [`Self::NAME`]).
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Human/model-readable description of the capability.
    fn description(&self) -> String;

    /// JSON schema describing required and optional arguments.
    fn parameters_schema(&self) -> Value;

    /// Side-effect class of this capability.
    fn side_effect(&self) -> SideEffect {
        SideEffect::ReadOnly
    }

    /// Execute the tool.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;
}

/// Object-safe erasure of [`Tool`] used by agents at run time.
#[async_trait]
pub trait ToolDyn: Send + Sync {
    /// The tool's name.
    fn name(&self) -> &str;

    /// The tool's description.
    fn description(&self) -> String;

    /// Full schema-level definition handed to the model.
    fn definition(&self) -> ToolDefinition;

    /// Side-effect class.
    fn side_effect(&self) -> SideEffect;

    /// Execute with raw JSON arguments.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>;
}

/// A boxed dynamic tool.
pub type BoxedTool = Box<dyn ToolDyn>;

#[async_trait]
impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> String {
        Tool::description(self)
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Tool::name(self).to_owned(),
            description: Tool::description(self),
            parameters: self.parameters_schema(),
            side_effect: Tool::side_effect(self),
        }
    }

    fn side_effect(&self) -> SideEffect {
        Tool::side_effect(self)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let args: T::Args = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid_args(format!("{}: {e}", Tool::name(self))))?;
        let output = self
            .call(args)
            .await
            .map_err(|e| ToolError::execution(e.to_string()))?;
        serde_json::to_value(output).map_err(ToolError::Json)
    }
}
