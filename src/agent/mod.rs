//! Capability-bearing agents and their execution loop.
//!
//! An [`Agent`] is an immutable configuration — model handle, tool registry,
//! step budget, planning interval, identity — built once by [`AgentBuilder`]
//! and driven by the step loop in [`runner`]:
//!
//! 1. Ask the model to decide the next action given the transcript so far
//! 2. Execute the chosen tool (failures become step-record data)
//! 3. Append the step record and loop, re-planning at the configured cadence
//!
//! The loop stops on a terminal final answer, on the step ceiling, or when
//! the model itself can no longer produce a decision. All three outcomes are
//! reported through [`RunResult::status`] — `run` never returns an error.
//!
//! # Quick start
//!
//! ```rust,ignore
//! let agent = Agent::builder("assistant")
//!     .model(model)
//!     .tool(Box::new(my_tool))?
//!     .max_steps(10)
//!     .planning_interval(4)
//!     .build()?;
//!
//! let result = agent.run("find the author of the cited report").await;
//! ```

mod config;
mod result;
mod runner;

pub use config::{Agent, AgentBuilder};
pub use result::{RunResult, RunStatus, StepAction, StepRecord};
