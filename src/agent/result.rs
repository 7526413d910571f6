//! Run results and step records.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

/// Terminal status of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The agent produced a terminal final answer.
    Completed,
    /// The step ceiling was reached without a final answer; the result
    /// carries the best available partial answer.
    StepLimitExceeded,
    /// The decision process itself failed (model unreachable or
    /// unrecoverable); the answer explains why.
    Failed,
}

impl RunStatus {
    /// The wire label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::StepLimitExceeded => "step-limit-exceeded",
            Self::Failed => "failed",
        }
    }
}

/// The action taken in one step of an agent's loop.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepAction {
    /// A tool was invoked.
    ToolCall {
        /// Name of the invoked capability.
        name: String,
        /// Arguments it was invoked with.
        arguments: Value,
    },
    /// The model emitted the terminal final answer.
    FinalAnswer,
}

/// One iteration of an agent's loop.
///
/// Steps are strictly sequential; their order is the basis for re-planning
/// and for the run summary handed to a delegating parent.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based ordinal position within the run.
    pub step: usize,
    /// What the agent did.
    pub action: StepAction,
    /// The tool result (or final answer text) observed.
    pub observation: String,
    /// Error text when the action failed; the model sees this in the next
    /// decision and is expected to adapt.
    pub error: Option<String>,
}

/// The outcome of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Name of the agent that produced this result.
    pub agent_name: String,
    /// Final answer, or the best partial answer for non-completed runs.
    pub answer: Value,
    /// How the run ended.
    pub status: RunStatus,
    /// Ordered step records. Owned by this result; the run keeps no alias.
    pub steps: Vec<StepRecord>,
}

impl RunResult {
    /// The answer as display text.
    #[must_use]
    pub fn answer_text(&self) -> String {
        match &self.answer {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Render the ordered step records as a readable trace.
    ///
    /// Used by the managed-agent wrapper when the delegation contract asks
    /// for a run summary, so the parent can audit how the answer was
    /// produced.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        for record in &self.steps {
            match &record.action {
                StepAction::ToolCall { name, arguments } => {
                    let _ = write!(out, "Step {}: called '{}' with {}", record.step, name, arguments);
                }
                StepAction::FinalAnswer => {
                    let _ = write!(out, "Step {}: final answer", record.step);
                }
            }
            match &record.error {
                Some(err) => {
                    let _ = writeln!(out, "\n  Error: {err}");
                }
                None => {
                    let _ = writeln!(out, "\n  Observation: {}", record.observation);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn summary_renders_every_step_in_order() {
        let result = RunResult {
            agent_name: "searcher".to_owned(),
            answer: json!("done"),
            status: RunStatus::Completed,
            steps: vec![
                StepRecord {
                    step: 1,
                    action: StepAction::ToolCall {
                        name: "web_search".to_owned(),
                        arguments: json!({ "query": "rust" }),
                    },
                    observation: "three results".to_owned(),
                    error: None,
                },
                StepRecord {
                    step: 2,
                    action: StepAction::ToolCall {
                        name: "visit_page".to_owned(),
                        arguments: json!({ "url": "https://example.com" }),
                    },
                    observation: String::new(),
                    error: Some("execution failed: timeout".to_owned()),
                },
                StepRecord {
                    step: 3,
                    action: StepAction::FinalAnswer,
                    observation: "done".to_owned(),
                    error: None,
                },
            ],
        };

        let summary = result.render_summary();
        let pos_1 = summary.find("Step 1: called 'web_search'").expect("step 1");
        let pos_2 = summary.find("Error: execution failed: timeout").expect("step 2 error");
        let pos_3 = summary.find("Step 3: final answer").expect("step 3");
        assert!(pos_1 < pos_2 && pos_2 < pos_3);
    }

    #[test]
    fn status_labels() {
        assert_eq!(RunStatus::StepLimitExceeded.as_str(), "step-limit-exceeded");
        assert_eq!(RunStatus::Completed.as_str(), "completed");
    }
}
