//! Delver is a small orchestration core for two-tier research agents: a
//! planning **manager** agent that delegates web research to a managed
//! tool-calling **sub-agent** and synthesizes the result into a final answer.
//!
//! The crate implements the delegation and step-budget protocol only. The
//! language model, the HTTP/scraping bodies, and the UI are external
//! collaborators consumed through narrow traits:
//!
//! - [`model::Model`] — `decide(context) -> action`, the whole model boundary.
//! - [`browse::PageFetcher`] / [`browse::SearchProvider`] — network bodies
//!   for the session-backed browsing tools.
//! - [`agent::Agent::run`] — the single entry point any front end consumes.
//!
//! # Architecture
//!
//! ```text
//! Manager Agent (plans every k steps, max 12 steps)
//!   ├─ direct tools (caller-supplied, e.g. text inspection)
//!   └─ ManagedAgentTool("search_agent")         ← delegation boundary
//!        └─ Sub-agent (plans every k steps, max 20 steps)
//!             └─ browsing tools sharing one BrowsingSession
//! ```
//!
//! Delegation is synchronous: the manager's step that invoked the wrapper
//! blocks until the entire sub-run completes, and the sub-run's outcome
//! (including a step-limit or failure status) comes back as tool-result
//! *data*, never as an error the parent must catch.

pub mod agent;
pub mod assembly;
pub mod browse;
pub mod delegation;
pub mod error;
pub mod message;
pub mod model;
pub mod tool;

pub use agent::{Agent, AgentBuilder, RunResult, RunStatus, StepAction, StepRecord};
pub use assembly::{AgentBudget, OrchestrationConfig, assemble};
pub use delegation::{DelegationContract, ManagedAgentTool};
pub use error::{Error, Result};
pub use model::{Decision, DecisionRequest, Model, ModelError, RequestKind, ToolCallRequest};
pub use tool::{BoxedTool, SideEffect, Tool, ToolDefinition, ToolDyn, ToolError, ToolRegistry};
