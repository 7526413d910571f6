//! One-time construction of the manager / sub-agent hierarchy.
//!
//! [`assemble`] is pure composition: it instantiates the shared
//! [`BrowsingSession`] once, binds the browsing tool set to it, builds the
//! research sub-agent with its budgets, wraps it under its delegation
//! contract, and builds the manager with its direct tools plus the wrapper.
//! It must run exactly once per process lifetime — a second call is a
//! configuration error — and before any task is accepted.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::agent::Agent;
use crate::browse::{
    ArchiveSearchTool, BrowsingSession, FindNextTool, FindTool, PageDownTool, PageFetcher,
    PageUpTool, SearchProvider, VisitTool, WebSearchTool,
};
use crate::delegation::{DelegationContract, ManagedAgentTool};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::tool::BoxedTool;

/// Name the manager delegates research tasks to.
pub const SEARCH_AGENT_NAME: &str = "search_agent";

/// Default viewport size in characters (five "screens" of 1024).
pub const DEFAULT_VIEWPORT_SIZE: usize = 1024 * 5;

/// Delegation description shown to the manager. Part of the protocol: the
/// manager reads this to decide when to delegate rather than act directly.
const SEARCH_AGENT_DESCRIPTION: &str = "\
A team member that will search the internet to answer your question. \
Ask them for anything that requires browsing the web, and give them as much \
context as possible — in particular a timeframe if the question has one. \
Complex search tasks are fine, like finding a difference between two pages. \
Phrase the request as a real sentence, not a few keywords.";

/// Standing guidance merged with every delegated request.
const SEARCH_AGENT_TEMPLATE: &str = "\
You're a helpful agent named 'search_agent'. You have been submitted this \
task by your manager.
---
Task:
{task}
---
You can navigate to .txt online files. If a non-html page is in another \
format, especially .pdf, use the text inspection tool to read it. If after \
some searching you find you need more information to answer, give your \
clarification request as your final answer.";

/// Has [`assemble`] already run in this process?
static ASSEMBLED: AtomicBool = AtomicBool::new(false);

/// Step budget and planning cadence for one agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentBudget {
    /// Ceiling on action iterations per run.
    pub max_steps: usize,
    /// Re-plan every N steps; 0 disables re-planning.
    pub planning_interval: usize,
}

impl AgentBudget {
    /// Create a budget.
    #[must_use]
    pub const fn new(max_steps: usize, planning_interval: usize) -> Self {
        Self {
            max_steps,
            planning_interval,
        }
    }
}

/// Everything [`assemble`] needs to wire the hierarchy.
pub struct OrchestrationConfig {
    model: Arc<dyn Model>,
    search_provider: Arc<dyn SearchProvider>,
    page_fetcher: Arc<dyn PageFetcher>,
    downloads_dir: PathBuf,
    viewport_size: usize,
    sub_agent_budget: AgentBudget,
    manager_budget: AgentBudget,
    verbosity_level: u8,
    sub_agent_tools: Vec<BoxedTool>,
    manager_tools: Vec<BoxedTool>,
    manager_allowed_capabilities: Option<Vec<String>>,
}

impl OrchestrationConfig {
    /// Create a configuration with the default budgets (sub-agent 20 steps /
    /// plan every 4; manager 12 steps / plan every 4).
    pub fn new(
        model: Arc<dyn Model>,
        search_provider: Arc<dyn SearchProvider>,
        page_fetcher: Arc<dyn PageFetcher>,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            search_provider,
            page_fetcher,
            downloads_dir: downloads_dir.into(),
            viewport_size: DEFAULT_VIEWPORT_SIZE,
            sub_agent_budget: AgentBudget::new(20, 4),
            manager_budget: AgentBudget::new(12, 4),
            verbosity_level: 2,
            sub_agent_tools: Vec::new(),
            manager_tools: Vec::new(),
            manager_allowed_capabilities: None,
        }
    }

    /// Override the viewport size.
    #[must_use]
    pub const fn viewport_size(mut self, size: usize) -> Self {
        self.viewport_size = size;
        self
    }

    /// Override the sub-agent's budget.
    #[must_use]
    pub const fn sub_agent_budget(mut self, budget: AgentBudget) -> Self {
        self.sub_agent_budget = budget;
        self
    }

    /// Override the manager's budget.
    #[must_use]
    pub const fn manager_budget(mut self, budget: AgentBudget) -> Self {
        self.manager_budget = budget;
        self
    }

    /// Set the logging verbosity for both agents.
    #[must_use]
    pub const fn verbosity_level(mut self, level: u8) -> Self {
        self.verbosity_level = level;
        self
    }

    /// Extra tools for the sub-agent (e.g. a text inspection tool whose
    /// body is supplied by the caller).
    #[must_use]
    pub fn sub_agent_tools(mut self, tools: Vec<BoxedTool>) -> Self {
        self.sub_agent_tools = tools;
        self
    }

    /// Direct tools for the manager (e.g. visualization, text inspection).
    #[must_use]
    pub fn manager_tools(mut self, tools: Vec<BoxedTool>) -> Self {
        self.manager_tools = tools;
        self
    }

    /// Explicit allow-list of capability names the manager may invoke.
    ///
    /// A security boundary bounding what side effects the manager can
    /// trigger. Include [`SEARCH_AGENT_NAME`] or the manager will be unable
    /// to delegate.
    #[must_use]
    pub fn manager_allowed_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manager_allowed_capabilities =
            Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl std::fmt::Debug for OrchestrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationConfig")
            .field("downloads_dir", &self.downloads_dir)
            .field("viewport_size", &self.viewport_size)
            .field("sub_agent_budget", &self.sub_agent_budget)
            .field("manager_budget", &self.manager_budget)
            .finish_non_exhaustive()
    }
}

/// Build the two-tier hierarchy and return the manager agent.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if called more than once per process,
/// and propagates I/O errors from creating the downloads directory and
/// configuration errors from agent construction.
pub fn assemble(config: OrchestrationConfig) -> Result<Agent> {
    if ASSEMBLED.swap(true, Ordering::SeqCst) {
        return Err(Error::configuration(
            "orchestration already assembled in this process",
        ));
    }

    std::fs::create_dir_all(&config.downloads_dir)?;
    debug!(downloads_dir = %config.downloads_dir.display(), "assembling agent hierarchy");

    // One browsing session per hierarchy: every browsing tool below shares
    // this navigation state, and nothing else may.
    let session = Arc::new(BrowsingSession::new(
        config.viewport_size,
        config.downloads_dir,
    ));

    let fetcher = config.page_fetcher;
    let mut web_tools: Vec<BoxedTool> = vec![
        Box::new(WebSearchTool::new(
            Arc::clone(&session),
            config.search_provider,
        )),
        Box::new(VisitTool::new(Arc::clone(&session), Arc::clone(&fetcher))),
        Box::new(ArchiveSearchTool::new(Arc::clone(&session), fetcher)),
        Box::new(PageUpTool::new(Arc::clone(&session))),
        Box::new(PageDownTool::new(Arc::clone(&session))),
        Box::new(FindTool::new(Arc::clone(&session))),
        Box::new(FindNextTool::new(Arc::clone(&session))),
    ];
    web_tools.extend(config.sub_agent_tools);

    let sub_agent = Agent::builder(SEARCH_AGENT_NAME)
        .description(SEARCH_AGENT_DESCRIPTION)
        .model(Arc::clone(&config.model))
        .tools(web_tools)?
        .max_steps(config.sub_agent_budget.max_steps)
        .planning_interval(config.sub_agent_budget.planning_interval)
        .verbosity_level(config.verbosity_level)
        .build()?;

    let contract = DelegationContract::new(SEARCH_AGENT_NAME, SEARCH_AGENT_DESCRIPTION)
        .instruction_template(SEARCH_AGENT_TEMPLATE)
        .provide_run_summary(true);
    let wrapper = ManagedAgentTool::new(sub_agent, contract)?;

    let mut manager = Agent::builder("manager")
        .instructions(
            "Solve the task you are given. Delegate web research to your \
             team member and cross-check what they report before answering.",
        )
        .model(config.model)
        .tools(config.manager_tools)?
        .tool(Box::new(wrapper))?
        .max_steps(config.manager_budget.max_steps)
        .planning_interval(config.manager_budget.planning_interval)
        .verbosity_level(config.verbosity_level);

    if let Some(allowed) = config.manager_allowed_capabilities {
        manager = manager.allowed_capabilities(allowed);
    }

    manager.build()
}
