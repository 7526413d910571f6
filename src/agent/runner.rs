//! The agent execution loop.
//!
//! [`drive`] runs an [`Agent`] through its step loop:
//!
//! 1. At the planning cadence, ask the model for an updated plan (bookkeeping,
//!    not a step) and fold it into the transcript
//! 2. Ask the model to decide the next action given the transcript and tools
//! 3. Execute the chosen tool; failures become the step's error field
//! 4. Append the step record and the tool response, then loop
//!
//! The loop stops on a final answer (`Completed`), when the step ceiling is
//! reached (`StepLimitExceeded`, carrying the best partial answer — the step
//! ceiling is the system's only liveness guarantee against runaway
//! recursion), or when the model cannot produce a decision (`Failed`). Tool
//! errors never end the run: they are data the model observes on its next
//! decision and is expected to adapt to.

use serde_json::Value;
use tracing::{debug, warn};

use crate::message::Message;
use crate::model::{Decision, DecisionRequest, RequestKind, ToolCallRequest};

use super::config::Agent;
use super::result::{RunResult, RunStatus, StepAction, StepRecord};

/// Execute an agent run to completion.
pub(super) async fn drive(agent: &Agent, task: &str) -> RunResult {
    let mut transcript = Vec::new();
    let mut steps: Vec<StepRecord> = Vec::new();
    let mut last_observation: Option<String> = None;

    if !agent.instructions.is_empty() {
        transcript.push(Message::system(&agent.instructions));
    }
    transcript.push(Message::user(task));

    let definitions = agent.tools.definitions();

    for step in 1..=agent.max_steps {
        debug!(agent = %agent.name, step, "starting step");

        // Re-planning cadence: immediately before steps k, 2k, 3k, ...
        // A plan is transcript bookkeeping, not a step record.
        if agent.planning_interval > 0 && step % agent.planning_interval == 0 {
            match agent
                .model
                .decide(DecisionRequest {
                    kind: RequestKind::Plan,
                    transcript: &transcript,
                    tools: &definitions,
                })
                .await
            {
                Ok(Decision::Plan(plan)) => {
                    debug!(agent = %agent.name, step, "updated plan");
                    transcript.push(Message::assistant(format!("Updated plan:\n{plan}")));
                }
                Ok(_) => {
                    warn!(agent = %agent.name, step, "model returned a non-plan for a planning request");
                }
                Err(e) => return failed(agent, steps, &e.to_string()),
            }
        }

        let decision = match agent
            .model
            .decide(DecisionRequest {
                kind: RequestKind::Action,
                transcript: &transcript,
                tools: &definitions,
            })
            .await
        {
            Ok(decision) => decision,
            Err(e) => return failed(agent, steps, &e.to_string()),
        };

        match decision {
            Decision::FinalAnswer(answer) => {
                let text = answer_text(&answer);
                transcript.push(Message::assistant(&text));
                steps.push(StepRecord {
                    step,
                    action: StepAction::FinalAnswer,
                    observation: text,
                    error: None,
                });
                return RunResult {
                    agent_name: agent.name.clone(),
                    answer,
                    status: RunStatus::Completed,
                    steps,
                };
            }

            // A bare plan where an action was expected is treated as the
            // model's terminal text output.
            Decision::Plan(text) => {
                transcript.push(Message::assistant(&text));
                steps.push(StepRecord {
                    step,
                    action: StepAction::FinalAnswer,
                    observation: text.clone(),
                    error: None,
                });
                return RunResult {
                    agent_name: agent.name.clone(),
                    answer: Value::String(text),
                    status: RunStatus::Completed,
                    steps,
                };
            }

            Decision::CallTool(call) => {
                transcript.push(Message::tool_call(format!(
                    "{}({})",
                    call.name, call.arguments
                )));

                let (observation, error) = execute_call(agent, &call).await;

                let response = error.as_ref().map_or_else(
                    || observation.clone(),
                    |err| format!("Error: {err}"),
                );
                transcript.push(Message::tool_response(&response));

                if agent.verbosity_level >= 2 {
                    debug!(agent = %agent.name, step, tool = %call.name, %response, "step observed");
                }

                if error.is_none() {
                    last_observation = Some(observation.clone());
                }
                steps.push(StepRecord {
                    step,
                    action: StepAction::ToolCall {
                        name: call.name,
                        arguments: call.arguments,
                    },
                    observation,
                    error,
                });
            }
        }
    }

    // Step ceiling reached without a terminal answer.
    warn!(agent = %agent.name, max_steps = agent.max_steps, "step limit exceeded");
    let answer = last_observation.map_or_else(
        || {
            Value::String(format!(
                "Could not complete the task within {} steps.",
                agent.max_steps
            ))
        },
        Value::String,
    );
    RunResult {
        agent_name: agent.name.clone(),
        answer,
        status: RunStatus::StepLimitExceeded,
        steps,
    }
}

/// Dispatch one tool call, enforcing the capability allow-list.
///
/// Returns `(observation, error)`; exactly one of the two is meaningful.
async fn execute_call(agent: &Agent, call: &ToolCallRequest) -> (String, Option<String>) {
    if let Some(allowed) = &agent.allowed_capabilities
        && !allowed.contains(&call.name)
    {
        warn!(agent = %agent.name, tool = %call.name, "capability not in allow-list");
        return (
            String::new(),
            Some(format!(
                "capability '{}' is not in this agent's allow-list",
                call.name
            )),
        );
    }

    let Some(tool) = agent.tools.get(&call.name) else {
        warn!(agent = %agent.name, tool = %call.name, "tool not found");
        return (
            String::new(),
            Some(format!("tool '{}' not found", call.name)),
        );
    };

    match tool.call_json(call.arguments.clone()).await {
        Ok(value) => (answer_text(&value), None),
        Err(e) => (String::new(), Some(e.to_string())),
    }
}

fn failed(agent: &Agent, steps: Vec<StepRecord>, message: &str) -> RunResult {
    warn!(agent = %agent.name, %message, "decision process failed");
    RunResult {
        agent_name: agent.name.clone(),
        answer: Value::String(format!("The run failed: {message}")),
        status: RunStatus::Failed,
        steps,
    }
}

fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::model::{Model, ModelError};
    use crate::tool::{Tool, ToolError};

    use super::*;

    /// Model double that replays a fixed script for action requests.
    struct ScriptedModel {
        script: Mutex<VecDeque<Result<Decision, ModelError>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<Decision, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    /// Model double that always calls one tool, never terminating.
    struct LoopingModel {
        tool: String,
        requests: Mutex<Vec<RequestKind>>,
    }

    impl LoopingModel {
        fn new(tool: &str) -> Arc<Self> {
            Arc::new(Self {
                tool: tool.to_owned(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_kinds(&self) -> Vec<RequestKind> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Model for LoopingModel {
        async fn decide(&self, request: DecisionRequest<'_>) -> Result<Decision, ModelError> {
            self.requests.lock().expect("lock").push(request.kind);
            match request.kind {
                RequestKind::Plan => Ok(Decision::Plan("keep searching".to_owned())),
                RequestKind::Action => Ok(Decision::CallTool(ToolCallRequest::new(
                    &self.tool,
                    json!({}),
                ))),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn decide(&self, request: DecisionRequest<'_>) -> Result<Decision, ModelError> {
            if request.kind == RequestKind::Plan {
                return Ok(Decision::Plan("revised plan".to_owned()));
            }
            self.script
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::unavailable("script exhausted")))
        }
    }

    /// Tool that counts invocations and always returns an observation.
    #[derive(Default)]
    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        const NAME: &'static str = "probe";
        type Args = serde_json::Value;
        type Output = String;
        type Error = ToolError;

        fn description(&self) -> String {
            "Probe for information; never terminal.".to_owned()
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("observation {n}"))
        }
    }

    /// Tool stub that always errors.
    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        const NAME: &'static str = "broken";
        type Args = serde_json::Value;
        type Output = String;
        type Error = ToolError;

        fn description(&self) -> String {
            "Always fails.".to_owned()
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
            Err(ToolError::execution("backend unavailable"))
        }
    }

    fn call(tool: &str) -> Result<Decision, ModelError> {
        Ok(Decision::CallTool(ToolCallRequest::new(tool, json!({}))))
    }

    fn agent_with(
        model: Arc<dyn Model>,
        max_steps: usize,
        planning_interval: usize,
    ) -> Agent {
        Agent::builder("under-test")
            .model(model)
            .tool(Box::new(CountingTool::default()))
            .expect("register probe")
            .tool(Box::new(BrokenTool))
            .expect("register broken")
            .max_steps(max_steps)
            .planning_interval(planning_interval)
            .build()
            .expect("valid agent")
    }

    #[tokio::test]
    async fn step_limit_exceeded_after_exactly_n_iterations() {
        let model = LoopingModel::new("probe");
        let agent = agent_with(model.clone(), 3, 0);

        let result = agent.run("unanswerable").await;

        assert_eq!(result.status, RunStatus::StepLimitExceeded);
        assert_eq!(result.steps.len(), 3);
        // Exactly N action decisions, never N+1.
        let actions = model
            .request_kinds()
            .iter()
            .filter(|k| **k == RequestKind::Action)
            .count();
        assert_eq!(actions, 3);
        // Best partial answer is the last tool observation.
        assert_eq!(result.answer, json!("observation 3"));
    }

    #[tokio::test]
    async fn single_step_budget() {
        let model = LoopingModel::new("probe");
        let agent = agent_with(model, 1, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::StepLimitExceeded);
        assert_eq!(result.steps.len(), 1);
    }

    #[tokio::test]
    async fn completed_on_step_two_of_three() {
        let model = ScriptedModel::new(vec![
            call("probe"),
            Ok(Decision::FinalAnswer(json!("the answer"))),
        ]);
        let agent = agent_with(model, 3, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.answer, json!("the answer"));
        assert!(matches!(result.steps[1].action, StepAction::FinalAnswer));
    }

    #[tokio::test]
    async fn planning_inserted_before_steps_k_and_2k() {
        let model = LoopingModel::new("probe");
        let agent = agent_with(model.clone(), 5, 2);

        let result = agent.run("unanswerable").await;
        assert_eq!(result.status, RunStatus::StepLimitExceeded);

        // Steps 1..=5 with interval 2: plan requests precede steps 2 and 4.
        use RequestKind::{Action, Plan};
        assert_eq!(
            model.request_kinds(),
            vec![Action, Plan, Action, Action, Plan, Action, Action]
        );
    }

    #[tokio::test]
    async fn no_planning_when_interval_is_zero() {
        let model = LoopingModel::new("probe");
        let agent = agent_with(model.clone(), 4, 0);

        agent.run("unanswerable").await;

        assert!(
            model
                .request_kinds()
                .iter()
                .all(|k| *k == RequestKind::Action)
        );
    }

    #[tokio::test]
    async fn tool_error_is_recorded_and_run_continues() {
        let model = ScriptedModel::new(vec![
            call("broken"),
            Ok(Decision::FinalAnswer(json!("adapted"))),
        ]);
        let agent = agent_with(model, 5, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.steps.len(), 2);
        let err = result.steps[0].error.as_deref().expect("first step errored");
        assert!(err.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn always_erroring_tool_still_yields_a_result() {
        let model = LoopingModel::new("broken");
        let agent = agent_with(model, 2, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::StepLimitExceeded);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.error.is_some()));
        // No successful observation, so the marker answer is used.
        assert!(result.answer_text().contains("Could not complete"));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_step_not_a_crash() {
        let model = ScriptedModel::new(vec![
            call("no_such_tool"),
            Ok(Decision::FinalAnswer(json!("done"))),
        ]);
        let agent = agent_with(model, 5, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::Completed);
        let err = result.steps[0].error.as_deref().expect("error recorded");
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_failed_status() {
        let model = ScriptedModel::new(vec![
            call("probe"),
            Err(ModelError::unavailable("connection refused")),
        ]);
        let agent = agent_with(model, 5, 0);

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.answer_text().contains("connection refused"));
        // The successful step before the failure is preserved.
        assert_eq!(result.steps.len(), 1);
    }

    #[tokio::test]
    async fn allow_list_refuses_unlisted_capability() {
        let model = ScriptedModel::new(vec![
            call("broken"),
            Ok(Decision::FinalAnswer(json!("done"))),
        ]);
        let agent = Agent::builder("restricted")
            .model(model)
            .tool(Box::new(BrokenTool))
            .expect("register broken")
            .allowed_capabilities(["probe"])
            .max_steps(5)
            .build()
            .expect("valid agent");

        let result = agent.run("find X").await;

        assert_eq!(result.status, RunStatus::Completed);
        let err = result.steps[0].error.as_deref().expect("refused");
        assert!(err.contains("allow-list"));
    }

    #[test]
    fn zero_max_steps_is_a_configuration_error() {
        let model = LoopingModel::new("probe");
        let err = Agent::builder("bad")
            .model(model)
            .max_steps(0)
            .build()
            .expect_err("must reject zero budget");
        assert!(matches!(err, crate::error::Error::Configuration(_)));
    }
}
