//! Agent configuration and builder.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::tool::{BoxedTool, ToolRegistry};

use super::result::RunResult;

/// An immutable agent configuration.
///
/// Constructed once by [`AgentBuilder`] at assembly time; a run never
/// mutates it, so one `Agent` can serve any number of sequential runs with
/// no state leaking between them.
pub struct Agent {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) instructions: String,
    pub(crate) model: Arc<dyn Model>,
    pub(crate) tools: ToolRegistry,
    pub(crate) max_steps: usize,
    pub(crate) planning_interval: usize,
    pub(crate) verbosity_level: u8,
    pub(crate) allowed_capabilities: Option<HashSet<String>>,
}

impl Agent {
    /// Start building an agent with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// The agent's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description used when this agent is exposed as a delegation target.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The configured step ceiling.
    #[must_use]
    pub const fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// The configured re-planning cadence (0 = never).
    #[must_use]
    pub const fn planning_interval(&self) -> usize {
        self.planning_interval
    }

    /// Execute a task to completion.
    ///
    /// This is the orchestration core's single entry point. The returned
    /// [`RunResult`] carries the final answer, the run status, and the
    /// ordered step records; it is never an error — budget exhaustion and
    /// decision-process failure are statuses, not exceptions.
    pub async fn run(&self, task: &str) -> RunResult {
        super::runner::drive(self, task).await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("tools", &self.tools.names())
            .field("max_steps", &self.max_steps)
            .field("planning_interval", &self.planning_interval)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    description: String,
    instructions: String,
    model: Option<Arc<dyn Model>>,
    tools: ToolRegistry,
    max_steps: usize,
    planning_interval: usize,
    verbosity_level: u8,
    allowed_capabilities: Option<HashSet<String>>,
}

impl AgentBuilder {
    /// Create a builder for an agent with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instructions: String::new(),
            model: None,
            tools: ToolRegistry::new(),
            max_steps: 10,
            planning_interval: 0,
            verbosity_level: 1,
            allowed_capabilities: None,
        }
    }

    /// Natural-language description shown to a parent agent when this agent
    /// is exposed as a delegation target.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Standing system instructions prepended to every run's transcript.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// The model collaborator driving this agent's decisions.
    #[must_use]
    pub fn model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a tool with the same name is
    /// already registered.
    pub fn tool(mut self, tool: BoxedTool) -> Result<Self> {
        self.tools.add(tool)?;
        Ok(self)
    }

    /// Register several tools at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on the first duplicate name.
    pub fn tools(mut self, tools: Vec<BoxedTool>) -> Result<Self> {
        for tool in tools {
            self.tools.add(tool)?;
        }
        Ok(self)
    }

    /// Ceiling on action iterations per run. Must be at least 1.
    #[must_use]
    pub const fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Re-plan every `interval` steps; 0 disables re-planning.
    #[must_use]
    pub const fn planning_interval(mut self, interval: usize) -> Self {
        self.planning_interval = interval;
        self
    }

    /// Logging verbosity (0 = quiet, 2 = log observations).
    #[must_use]
    pub const fn verbosity_level(mut self, level: u8) -> Self {
        self.verbosity_level = level;
        self
    }

    /// Restrict which capability names this agent may invoke.
    ///
    /// This is a security boundary, not advisory: a tool call outside the
    /// allow-list is refused and recorded as an error step, even if the
    /// tool is registered.
    #[must_use]
    pub fn allowed_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_capabilities = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Finalize the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the name is empty, no model is
    /// configured, or `max_steps` is zero.
    pub fn build(self) -> Result<Agent> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration("agent name must not be empty"));
        }
        let model = self.model.ok_or_else(|| {
            Error::configuration(format!("agent '{}' has no model configured", self.name))
        })?;
        if self.max_steps == 0 {
            return Err(Error::configuration(format!(
                "agent '{}': max_steps must be at least 1",
                self.name
            )));
        }

        Ok(Agent {
            name: self.name,
            description: self.description,
            instructions: self.instructions,
            model,
            tools: self.tools,
            max_steps: self.max_steps,
            planning_interval: self.planning_interval,
            verbosity_level: self.verbosity_level,
            allowed_capabilities: self.allowed_capabilities,
        })
    }
}

impl std::fmt::Debug for AgentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("name", &self.name)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
