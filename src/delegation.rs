//! Managed-agent delegation: exposing a whole agent as a single tool.
//!
//! [`ManagedAgentTool`] wraps an [`Agent`] behind the standard
//! [`ToolDyn`] interface so a parent agent can dispatch tasks to it exactly
//! as it dispatches any other capability. The [`DelegationContract`] is the
//! protocol surface: the name and description the parent decides by, the
//! standing guidance merged into every delegated request, and the
//! bandwidth/opacity trade-off of returning the sub-run's full trace.
//!
//! Delegation is synchronous from the parent's perspective: the parent's
//! step blocks until the entire sub-run completes. A sub-run that hits its
//! step ceiling or fails is *not* escalated as an error — its status comes
//! back inside the tool result text, and the parent's own loop decides
//! whether to retry, delegate differently, or proceed without it.

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::agent::{Agent, RunStatus};
use crate::error::Error;
use crate::tool::{SideEffect, ToolDefinition, ToolDyn, ToolError};

/// Default cap on identical failing delegation requests.
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// The delegation protocol between a parent agent and a managed sub-agent.
///
/// Constructed once at assembly time and immutable thereafter. The
/// description is part of the protocol, not cosmetic text: the parent reads
/// it to decide *when* to delegate versus act directly.
#[derive(Debug, Clone)]
pub struct DelegationContract {
    /// Name the parent invokes the sub-agent by.
    pub name: String,
    /// Description shown to the parent agent.
    pub description: String,
    /// Instruction template merged with each request. Must contain the
    /// `{task}` substitution point; treated as configuration data, never
    /// as logic.
    pub instruction_template: String,
    /// When true, the tool result includes a rendering of the sub-run's
    /// step records alongside the final answer. Costs parent context
    /// budget, improves verifiability.
    pub provide_run_summary: bool,
    /// How many times the identical request may end non-completed before
    /// further identical requests are refused.
    pub max_attempts_per_request: u32,
}

impl DelegationContract {
    /// Create a contract with the default template (`"{task}"`) and no
    /// run summary.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instruction_template: "{task}".to_owned(),
            provide_run_summary: false,
            max_attempts_per_request: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the instruction template. The parent's literal request replaces
    /// the `{task}` substitution point; everything around it is standing
    /// guidance the sub-agent receives on every call.
    #[must_use]
    pub fn instruction_template(mut self, template: impl Into<String>) -> Self {
        self.instruction_template = template.into();
        self
    }

    /// Return the full step trace alongside the final answer.
    #[must_use]
    pub const fn provide_run_summary(mut self, provide: bool) -> Self {
        self.provide_run_summary = provide;
        self
    }

    /// Cap identical failing requests (loop prevention at the delegation
    /// boundary).
    #[must_use]
    pub const fn max_attempts_per_request(mut self, attempts: u32) -> Self {
        self.max_attempts_per_request = attempts;
        self
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration(
                "delegation contract requires a non-empty name",
            ));
        }
        if !self.instruction_template.contains("{task}") {
            return Err(Error::configuration(format!(
                "delegation contract '{}': instruction template is missing the {{task}} substitution point",
                self.name
            )));
        }
        Ok(())
    }
}

/// Wraps an [`Agent`] as a tool callable by a parent agent.
pub struct ManagedAgentTool {
    agent: Agent,
    contract: DelegationContract,
    /// Count of non-completed sub-runs per distinct request string. An
    /// entry is cleared when the same request later completes, so the map
    /// only holds currently-failing requests.
    failures: Mutex<HashMap<String, u32>>,
}

impl ManagedAgentTool {
    /// Wrap `agent` under the given delegation contract.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the contract's name is empty or
    /// its instruction template lacks the `{task}` substitution point.
    pub fn new(agent: Agent, contract: DelegationContract) -> crate::error::Result<Self> {
        contract.validate()?;
        Ok(Self {
            agent,
            contract,
            failures: Mutex::new(HashMap::new()),
        })
    }

    /// Merge a request into the contract's instruction template.
    fn compose_task(&self, request: &str, context: Option<&str>) -> String {
        let mut task = self.contract.instruction_template.replace("{task}", request);
        if let Some(context) = context {
            let _ = write!(task, "\n\nAdditional context:\n{context}");
        }
        task
    }

    /// Render a sub-run outcome into the tool result the parent observes.
    fn render_result(&self, result: &crate::agent::RunResult) -> String {
        let mut out = match result.status {
            RunStatus::Completed => result.answer_text(),
            RunStatus::StepLimitExceeded => format!(
                "The '{}' agent stopped at its step limit of {} before finishing. Best partial answer:\n{}",
                self.contract.name,
                self.agent.max_steps(),
                result.answer_text()
            ),
            RunStatus::Failed => format!(
                "The '{}' agent could not complete the request: {}",
                self.contract.name,
                result.answer_text()
            ),
        };

        if self.contract.provide_run_summary {
            let _ = write!(
                out,
                "\n\nFor more detail, here is a summary of this agent's run:\n{}",
                result.render_summary()
            );
        }
        out
    }
}

impl std::fmt::Debug for ManagedAgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedAgentTool")
            .field("name", &self.contract.name)
            .field("provide_run_summary", &self.contract.provide_run_summary)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolDyn for ManagedAgentTool {
    fn name(&self) -> &str {
        &self.contract.name
    }

    fn description(&self) -> String {
        self.contract.description.clone()
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.contract.name.clone(),
            description: self.contract.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "Long, detailed description of the task. Write a real sentence, not a few keywords."
                    },
                    "context": {
                        "type": "string",
                        "description": "Any extra context the agent may need: timeframes, prior findings, constraints. Optional."
                    }
                },
                "required": ["task"]
            }),
            side_effect: SideEffect::Mutating,
        }
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let request = args
            .get("task")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if request.is_empty() {
            return Err(ToolError::invalid_args(
                "delegation requires a non-empty 'task' argument",
            ));
        }
        let context = args.get("context").and_then(Value::as_str);

        // Loop prevention: refuse the identical request once it has failed
        // the contracted number of times.
        {
            let failures = self.failures.lock().await;
            if let Some(&count) = failures.get(&request)
                && count >= self.contract.max_attempts_per_request
            {
                warn!(agent = %self.contract.name, %request, count, "refusing repeated failing delegation");
                return Ok(Value::String(format!(
                    "The '{}' agent already failed this exact request {count} times; \
                     not retrying. Rephrase the request or proceed without it.",
                    self.contract.name
                )));
            }
        }

        debug!(agent = %self.contract.name, "delegating task");
        let task = self.compose_task(&request, context);
        let result = self.agent.run(&task).await;

        if result.status == RunStatus::Completed {
            self.failures.lock().await.remove(&request);
        } else {
            let mut failures = self.failures.lock().await;
            *failures.entry(request).or_insert(0) += 1;
        }

        Ok(Value::String(self.render_result(&result)))
    }
}
