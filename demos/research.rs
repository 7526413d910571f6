//! Wires the two-tier hierarchy with stub collaborators and runs one task.
//!
//! Swap the stubs for a real model adapter, search provider, and fetcher to
//! get a working deep-research assistant.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use delver::browse::{Fetched, Page, PageFetcher, SearchProvider, SearchResult};
use delver::{
    AgentBudget, Decision, DecisionRequest, Model, ModelError, OrchestrationConfig, RequestKind,
    ToolCallRequest, ToolError, assemble,
};

/// Canned model: delegates once, then answers with what came back.
struct CannedModel;

#[async_trait]
impl Model for CannedModel {
    async fn decide(
        &self,
        request: DecisionRequest<'_>,
    ) -> std::result::Result<Decision, ModelError> {
        if request.kind == RequestKind::Plan {
            return Ok(Decision::Plan("search, then read the best hit".to_owned()));
        }
        let in_sub_run = request
            .transcript
            .iter()
            .any(|m| m.content.contains("submitted this task by your manager"));
        if in_sub_run {
            // The sub-agent searches once, then reports.
            let searched = request
                .transcript
                .iter()
                .any(|m| m.content.contains("web_search"));
            if searched {
                return Ok(Decision::FinalAnswer(Value::String(
                    "Rust 1.0 was released on 15 May 2015.".to_owned(),
                )));
            }
            return Ok(Decision::CallTool(ToolCallRequest::new(
                "web_search",
                json!({ "query": "rust 1.0 release date" }),
            )));
        }
        let delegated = request
            .transcript
            .iter()
            .any(|m| m.role == delver::message::Role::ToolResponse);
        if delegated {
            return Ok(Decision::FinalAnswer(Value::String(
                "15 May 2015".to_owned(),
            )));
        }
        Ok(Decision::CallTool(ToolCallRequest::new(
            "search_agent",
            json!({ "task": "When was Rust 1.0 released?" }),
        )))
    }
}

#[derive(Debug)]
struct CannedSearch;

#[async_trait]
impl SearchProvider for CannedSearch {
    fn provider_name(&self) -> &str {
        "canned"
    }

    async fn search(
        &self,
        _query: &str,
        _filter_year: Option<u16>,
    ) -> std::result::Result<Vec<SearchResult>, ToolError> {
        Ok(vec![SearchResult {
            title: "Announcing Rust 1.0".to_owned(),
            url: "https://blog.rust-lang.org/2015/05/15/Rust-1.0.html".to_owned(),
            snippet: "Today we are proud to announce the 1.0 release of Rust.".to_owned(),
        }])
    }
}

#[derive(Debug)]
struct CannedFetcher;

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch(
        &self,
        url: &str,
        _downloads_dir: &Path,
    ) -> std::result::Result<Fetched, ToolError> {
        Ok(Fetched::Page(Page {
            url: url.to_owned(),
            title: "Announcing Rust 1.0".to_owned(),
            content: "Today we are proud to announce the 1.0 release of Rust.".to_owned(),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = OrchestrationConfig::new(
        Arc::new(CannedModel),
        Arc::new(CannedSearch),
        Arc::new(CannedFetcher),
        std::env::temp_dir().join("delver-downloads"),
    )
    .sub_agent_budget(AgentBudget::new(20, 4))
    .manager_budget(AgentBudget::new(12, 4));

    let manager = assemble(config)?;
    let result = manager.run("When was Rust 1.0 released?").await;

    println!("status: {}", result.status.as_str());
    println!("answer: {}", result.answer_text());
    println!("steps: {}", result.steps.len());

    Ok(())
}
