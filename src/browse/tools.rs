//! Session-backed browsing tools for the research sub-agent.
//!
//! Every tool here is constructed with the same [`BrowsingSession`] handle,
//! so search, visit, paging, and find calls all observe one consistent
//! navigation state within a delegated run.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::tool::{SideEffect, Tool, ToolError};

use super::{BrowsingSession, Fetched, Page, PageFetcher, SearchProvider, SearchResult};

/// Arguments for [`WebSearchTool`].
#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchArgs {
    /// The search query to perform.
    pub query: String,
    /// Restrict results to a given year. Optional.
    pub filter_year: Option<u16>,
}

/// Search the web and load the results page into the session.
pub struct WebSearchTool {
    session: Arc<BrowsingSession>,
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl WebSearchTool {
    /// Create a search tool bound to a session and provider.
    pub fn new(session: Arc<BrowsingSession>, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            session,
            provider,
            max_results: 10,
        }
    }

    /// Set the maximum number of results rendered per query.
    #[must_use]
    pub const fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    fn format_results(query: &str, results: &[SearchResult]) -> String {
        let mut output = format!("Search results for '{query}':\n\n");
        for (i, r) in results.iter().enumerate() {
            let _ = write!(output, "{}. {}\n\n", i + 1, r);
        }
        output
    }
}

impl std::fmt::Debug for WebSearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("provider", &self.provider.provider_name())
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    const NAME: &'static str = "web_search";
    type Args = WebSearchArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Perform a web search query and return the list of results, loading them as the current page.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The web search query to perform"
                },
                "filter_year": {
                    "type": "integer",
                    "description": "Restrict results to this year, e.g. 2020. Optional."
                }
            },
            "required": ["query"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if args.query.trim().is_empty() {
            return Err(ToolError::invalid_args("search query cannot be empty"));
        }

        debug!(provider = %self.provider.provider_name(), query = %args.query, "web search");
        let results = self.provider.search(&args.query, args.filter_year).await?;

        if results.is_empty() {
            let hint = if args.filter_year.is_some() {
                " Try removing the year filter."
            } else {
                " Try a less restrictive or shorter query."
            };
            return Err(ToolError::execution(format!(
                "no results found for '{}'.{hint}",
                args.query
            )));
        }

        let shown: Vec<SearchResult> =
            results.into_iter().take(self.max_results).collect();
        let content = Self::format_results(&args.query, &shown);
        Ok(self.session.set_page(Page {
            url: format!("search://{}", args.query),
            title: format!("Search results for '{}'", args.query),
            content,
        }))
    }
}

/// Arguments for [`VisitTool`].
#[derive(Debug, Clone, Deserialize)]
pub struct VisitArgs {
    /// The URL of the page to visit.
    pub url: String,
}

/// Visit a URL and load it as the session's current page.
pub struct VisitTool {
    session: Arc<BrowsingSession>,
    fetcher: Arc<dyn PageFetcher>,
}

impl VisitTool {
    /// Create a visit tool bound to a session and fetcher.
    pub fn new(session: Arc<BrowsingSession>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { session, fetcher }
    }
}

impl std::fmt::Debug for VisitTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for VisitTool {
    const NAME: &'static str = "visit_page";
    type Args = VisitArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Visit a webpage at a given URL and return its text. Non-text files are saved to the downloads folder instead.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "format": "uri",
                    "description": "The relative or absolute URL of the webpage to visit"
                }
            },
            "required": ["url"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(ToolError::invalid_args(
                "URL must start with http:// or https://",
            ));
        }

        debug!(url = %args.url, "visiting page");
        match self
            .fetcher
            .fetch(&args.url, self.session.downloads_dir())
            .await?
        {
            Fetched::Page(page) => Ok(self.session.set_page(page)),
            Fetched::Download { path, content_type } => Ok(format!(
                "Saved {} to '{}'. Use an inspection tool to read it.",
                content_type.as_deref().unwrap_or("file"),
                path.display()
            )),
        }
    }
}

/// Arguments for [`ArchiveSearchTool`].
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSearchArgs {
    /// The URL to look up in the web archive.
    pub url: String,
    /// The desired snapshot date, formatted as YYYYMMDD.
    pub date: String,
}

/// Load a Wayback Machine snapshot of a URL into the session.
pub struct ArchiveSearchTool {
    session: Arc<BrowsingSession>,
    fetcher: Arc<dyn PageFetcher>,
}

impl ArchiveSearchTool {
    /// Create an archive search tool bound to a session and fetcher.
    pub fn new(session: Arc<BrowsingSession>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { session, fetcher }
    }
}

impl std::fmt::Debug for ArchiveSearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSearchTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for ArchiveSearchTool {
    const NAME: &'static str = "find_archived_url";
    type Args = ArchiveSearchArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Given a URL, load the Wayback Machine snapshot closest to the desired date as the current page.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "format": "uri",
                    "description": "The URL you need the archive for"
                },
                "date": {
                    "type": "string",
                    "description": "The date of the desired snapshot, formatted as YYYYMMDD, e.g. 20200101"
                }
            },
            "required": ["url", "date"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(ToolError::invalid_args(
                "URL must start with http:// or https://",
            ));
        }
        if args.date.is_empty() || !args.date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ToolError::invalid_args(
                "date must be digits in YYYYMMDD form, e.g. 20200101",
            ));
        }

        let snapshot = format!("https://web.archive.org/web/{}/{}", args.date, args.url);
        debug!(url = %snapshot, "visiting archived page");
        match self
            .fetcher
            .fetch(&snapshot, self.session.downloads_dir())
            .await?
        {
            Fetched::Page(page) => Ok(format!(
                "Web archive snapshot of '{}' around {}:\n{}",
                args.url,
                args.date,
                self.session.set_page(page)
            )),
            Fetched::Download { path, content_type } => Ok(format!(
                "Saved {} to '{}'. Use an inspection tool to read it.",
                content_type.as_deref().unwrap_or("file"),
                path.display()
            )),
        }
    }
}

/// Empty argument object for cursor-only tools.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NoArgs {}

fn no_args_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Scroll the session viewport up one page.
pub struct PageUpTool {
    session: Arc<BrowsingSession>,
}

impl PageUpTool {
    /// Create a page-up tool bound to a session.
    pub const fn new(session: Arc<BrowsingSession>) -> Self {
        Self { session }
    }
}

impl std::fmt::Debug for PageUpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageUpTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for PageUpTool {
    const NAME: &'static str = "page_up";
    type Args = NoArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Scroll the viewport up one page-length on the current page.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        no_args_schema()
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.session.page_up()
    }
}

/// Scroll the session viewport down one page.
pub struct PageDownTool {
    session: Arc<BrowsingSession>,
}

impl PageDownTool {
    /// Create a page-down tool bound to a session.
    pub const fn new(session: Arc<BrowsingSession>) -> Self {
        Self { session }
    }
}

impl std::fmt::Debug for PageDownTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDownTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for PageDownTool {
    const NAME: &'static str = "page_down";
    type Args = NoArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Scroll the viewport down one page-length on the current page.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        no_args_schema()
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.session.page_down()
    }
}

/// Arguments for [`FindTool`].
#[derive(Debug, Clone, Deserialize)]
pub struct FindArgs {
    /// The string to search for on the page.
    pub search_string: String,
}

/// Find a string on the current page, like Ctrl+F.
pub struct FindTool {
    session: Arc<BrowsingSession>,
}

impl FindTool {
    /// Create a find tool bound to a session.
    pub const fn new(session: Arc<BrowsingSession>) -> Self {
        Self { session }
    }
}

impl std::fmt::Debug for FindTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FindTool {
    const NAME: &'static str = "find_on_page_ctrl_f";
    type Args = FindArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Scroll the viewport to the first occurrence of the search string, like Ctrl+F.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_string": {
                    "type": "string",
                    "description": "The string to search for on the page"
                }
            },
            "required": ["search_string"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.session.find(&args.search_string)
    }
}

/// Jump to the next occurrence of the last find query.
pub struct FindNextTool {
    session: Arc<BrowsingSession>,
}

impl FindNextTool {
    /// Create a find-next tool bound to a session.
    pub const fn new(session: Arc<BrowsingSession>) -> Self {
        Self { session }
    }
}

impl std::fmt::Debug for FindNextTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindNextTool").finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FindNextTool {
    const NAME: &'static str = "find_next";
    type Args = NoArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Scroll the viewport to the next occurrence of the last search string.".to_owned()
    }

    fn parameters_schema(&self) -> Value {
        no_args_schema()
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Mutating
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.session.find_next()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::tool::ToolDyn;

    use super::*;

    #[derive(Debug)]
    struct StubFetcher;

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, downloads_dir: &Path) -> Result<Fetched, ToolError> {
            if url.ends_with(".pdf") {
                return Ok(Fetched::Download {
                    path: downloads_dir.join("report.pdf"),
                    content_type: Some("application/pdf".to_owned()),
                });
            }
            Ok(Fetched::Page(Page {
                url: url.to_owned(),
                title: "Stub".to_owned(),
                content: "alpha beta gamma delta epsilon zeta".to_owned(),
            }))
        }
    }

    #[derive(Debug)]
    struct StubSearch;

    #[async_trait]
    impl SearchProvider for StubSearch {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn search(
            &self,
            query: &str,
            _filter_year: Option<u16>,
        ) -> Result<Vec<SearchResult>, ToolError> {
            if query == "nothing" {
                return Ok(Vec::new());
            }
            Ok(vec![SearchResult {
                title: "Result".to_owned(),
                url: "https://example.com".to_owned(),
                snippet: "a snippet".to_owned(),
            }])
        }
    }

    fn session() -> Arc<BrowsingSession> {
        Arc::new(BrowsingSession::new(12, "/tmp/downloads"))
    }

    #[tokio::test]
    async fn tools_share_one_navigation_state() {
        let session = session();
        let visit = VisitTool::new(Arc::clone(&session), Arc::new(StubFetcher));
        let down = PageDownTool::new(Arc::clone(&session));
        let find = FindTool::new(Arc::clone(&session));

        visit
            .call(VisitArgs {
                url: "https://example.com".to_owned(),
            })
            .await
            .expect("visit");

        // The paging tool observes the page the visit tool loaded.
        let view = down.call(NoArgs {}).await.expect("page down");
        assert!(view.contains("page 2 of"));

        let view = find
            .call(FindArgs {
                search_string: "zeta".to_owned(),
            })
            .await
            .expect("find");
        assert!(view.contains("Address: https://example.com"));
    }

    #[tokio::test]
    async fn search_loads_a_results_page() {
        let session = session();
        let tool = WebSearchTool::new(Arc::clone(&session), Arc::new(StubSearch));

        let view = tool
            .call(WebSearchArgs {
                query: "rust".to_owned(),
                filter_year: None,
            })
            .await
            .expect("search");
        assert!(view.contains("Address: search://rust"));
        assert!(session.history().contains(&"search://rust".to_owned()));
    }

    #[tokio::test]
    async fn empty_results_suggest_relaxing_the_query() {
        let session = session();
        let tool = WebSearchTool::new(session, Arc::new(StubSearch));

        let err = tool
            .call(WebSearchArgs {
                query: "nothing".to_owned(),
                filter_year: Some(1999),
            })
            .await
            .expect_err("no results");
        assert!(err.to_string().contains("year filter"));
    }

    #[tokio::test]
    async fn non_text_fetches_report_the_download_path() {
        let session = session();
        let tool = VisitTool::new(session, Arc::new(StubFetcher));

        let msg = tool
            .call(VisitArgs {
                url: "https://example.com/report.pdf".to_owned(),
            })
            .await
            .expect("download");
        assert!(msg.contains("report.pdf"));
        assert!(msg.contains("application/pdf"));
    }

    #[tokio::test]
    async fn archive_search_loads_the_snapshot_into_the_session() {
        let session = session();
        let tool = ArchiveSearchTool::new(Arc::clone(&session), Arc::new(StubFetcher));

        let view = tool
            .call(ArchiveSearchArgs {
                url: "https://example.com".to_owned(),
                date: "20200101".to_owned(),
            })
            .await
            .expect("archive visit");

        assert!(view.starts_with("Web archive snapshot of 'https://example.com' around 20200101:"));
        assert!(view.contains("web.archive.org/web/20200101/https://example.com"));
        // The snapshot becomes the shared session's current page.
        assert!(
            session
                .history()
                .contains(&"https://web.archive.org/web/20200101/https://example.com".to_owned())
        );
    }

    #[tokio::test]
    async fn archive_search_rejects_a_malformed_date() {
        let session = session();
        let tool = ArchiveSearchTool::new(session, Arc::new(StubFetcher));

        let err = tool
            .call(ArchiveSearchArgs {
                url: "https://example.com".to_owned(),
                date: "January 2020".to_owned(),
            })
            .await
            .expect_err("bad date");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn invalid_scheme_is_rejected() {
        let session = session();
        let tool = VisitTool::new(session, Arc::new(StubFetcher));

        let err = tool
            .call(VisitArgs {
                url: "ftp://example.com".to_owned(),
            })
            .await
            .expect_err("bad scheme");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn erased_tools_expose_their_schemas() {
        let session = session();
        let tool: Box<dyn ToolDyn> =
            Box::new(WebSearchTool::new(session, Arc::new(StubSearch)));
        let def = tool.definition();
        assert_eq!(def.name, "web_search");
        assert_eq!(def.parameters["required"], json!(["query"]));
        assert_eq!(def.side_effect, SideEffect::Mutating);
    }
}
