//! Shared browsing session state and the network collaborator traits.
//!
//! One [`BrowsingSession`] is shared by every browsing tool handed to one
//! sub-agent: navigation state (current page, viewport cursor, find cursor)
//! stays consistent across tool calls within one delegated run. The session
//! is explicitly owned and explicitly passed at tool construction — never an
//! implicit global — and must not be shared across two concurrently running
//! agent hierarchies.
//!
//! Actual HTTP fetching and search queries live behind [`PageFetcher`] and
//! [`SearchProvider`]; the orchestration core only manages the state those
//! results flow into.

pub mod tools;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tool::ToolError;

pub use tools::{
    ArchiveSearchTool, FindNextTool, FindTool, PageDownTool, PageUpTool, VisitTool, WebSearchTool,
};

/// A fetched page rendered to text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Source URL.
    pub url: String,
    /// Page title, if known.
    pub title: String,
    /// Rendered text content.
    pub content: String,
}

/// Outcome of fetching a URL.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// A text page to load into the session viewport.
    Page(Page),
    /// A non-text artifact written under the downloads directory.
    Download {
        /// Where the artifact was saved.
        path: PathBuf,
        /// Content type reported by the source, if any.
        content_type: Option<String>,
    },
}

/// External collaborator that fetches URLs.
///
/// Implementations own all HTTP concerns (headers, timeouts, redirects) and
/// write non-text artifacts under the provided downloads directory.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] on network or protocol failure; the owning
    /// agent records it as an error step.
    async fn fetch(&self, url: &str, downloads_dir: &Path) -> Result<Fetched, ToolError>;
}

/// A single web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the search result.
    pub title: String,
    /// URL of the search result.
    pub url: String,
    /// Snippet / description text.
    pub snippet: String,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})\n{}", self.title, self.url, self.snippet)
    }
}

/// External collaborator that executes web searches.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// A human-readable name for this provider (used in tracing output).
    fn provider_name(&self) -> &str;

    /// Execute a search query, optionally restricted to a year.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] on backend failure.
    async fn search(
        &self,
        query: &str,
        filter_year: Option<u16>,
    ) -> Result<Vec<SearchResult>, ToolError>;
}

/// Per-run navigation state guarded by the session mutex.
#[derive(Debug, Default)]
struct SessionState {
    page: Option<Page>,
    /// Byte ranges of the current page's viewports, on char boundaries.
    viewports: Vec<(usize, usize)>,
    current_viewport: usize,
    /// Lowercased page content; all find offsets live in this space, since
    /// lowercasing can change a char's byte length.
    lower: String,
    /// For each char of the original content, its byte offset there and in
    /// the lowercased copy.
    lower_starts: Vec<(usize, usize)>,
    find_query: Option<String>,
    /// Byte offset into `lower` just past the last find match.
    find_position: usize,
    history: Vec<String>,
}

/// Shared browsing state threaded through every tool of one sub-agent.
#[derive(Debug)]
pub struct BrowsingSession {
    viewport_size: usize,
    downloads_dir: PathBuf,
    state: Mutex<SessionState>,
}

impl BrowsingSession {
    /// Create a session with the given viewport size (characters per page
    /// of output) and downloads directory.
    #[must_use]
    pub fn new(viewport_size: usize, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            viewport_size: viewport_size.max(1),
            downloads_dir: downloads_dir.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Directory where fetchers save non-text artifacts.
    #[must_use]
    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Load a page into the session, resetting the viewport and find
    /// cursors, and return the first viewport.
    pub fn set_page(&self, page: Page) -> String {
        let viewports = paginate(&page.content, self.viewport_size);
        let (lower, lower_starts) = lowercase_index(&page.content);
        let mut state = self.state.lock().expect("session state poisoned");
        state.history.push(page.url.clone());
        state.page = Some(page);
        state.viewports = viewports;
        state.current_viewport = 0;
        state.lower = lower;
        state.lower_starts = lower_starts;
        state.find_query = None;
        state.find_position = 0;
        drop(state);
        self.current_view()
            .unwrap_or_else(|_| "(empty page)".to_owned())
    }

    /// The current viewport with an address/position header.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no page has been visited yet.
    pub fn current_view(&self) -> Result<String, ToolError> {
        let state = self.state.lock().expect("session state poisoned");
        let page = state
            .page
            .as_ref()
            .ok_or_else(|| ToolError::execution("no page loaded; visit a page first"))?;
        let total = state.viewports.len().max(1);
        let (start, end) = state
            .viewports
            .get(state.current_viewport)
            .copied()
            .unwrap_or((0, 0));
        Ok(format!(
            "Address: {}\nTitle: {}\nViewport position: showing page {} of {}.\n=======================\n{}",
            page.url,
            page.title,
            state.current_viewport + 1,
            total,
            &page.content[start..end]
        ))
    }

    /// Scroll one viewport down (clamped at the last viewport).
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no page has been visited yet.
    pub fn page_down(&self) -> Result<String, ToolError> {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            if state.page.is_none() {
                return Err(ToolError::execution("no page loaded; visit a page first"));
            }
            let last = state.viewports.len().saturating_sub(1);
            state.current_viewport = (state.current_viewport + 1).min(last);
        }
        self.current_view()
    }

    /// Scroll one viewport up (clamped at the first viewport).
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no page has been visited yet.
    pub fn page_up(&self) -> Result<String, ToolError> {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            if state.page.is_none() {
                return Err(ToolError::execution("no page loaded; visit a page first"));
            }
            state.current_viewport = state.current_viewport.saturating_sub(1);
        }
        self.current_view()
    }

    /// Find the first occurrence of `query` (case-insensitive) at or after
    /// the current viewport and jump to the viewport containing it.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no page is loaded or the string does
    /// not occur on the page.
    pub fn find(&self, query: &str) -> Result<String, ToolError> {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            let start = state
                .viewports
                .get(state.current_viewport)
                .map_or(0, |(start, _)| *start);
            let from = lower_offset(&state.lower_starts, start);
            Self::jump_to_match(&mut state, query, from)?;
        }
        self.current_view()
    }

    /// Jump to the next occurrence of the last find query.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when no find was issued on this page or no
    /// further occurrence exists.
    pub fn find_next(&self) -> Result<String, ToolError> {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            let query = state.find_query.clone().ok_or_else(|| {
                ToolError::execution("no prior find on this page; use the find tool first")
            })?;
            let from = state.find_position;
            Self::jump_to_match(&mut state, &query, from)?;
        }
        self.current_view()
    }

    /// URLs visited in this session, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("session state poisoned")
            .history
            .clone()
    }

    /// Find `query` in the lowercased content at or after `from` (an offset
    /// into that lowercased space) and jump to the viewport containing it.
    fn jump_to_match(
        state: &mut SessionState,
        query: &str,
        from: usize,
    ) -> Result<(), ToolError> {
        if state.page.is_none() {
            return Err(ToolError::execution("no page loaded; visit a page first"));
        }

        let needle = query.to_lowercase();
        let offset = state
            .lower
            .get(from..)
            .and_then(|tail| tail.find(&needle))
            .map(|pos| from + pos)
            .ok_or_else(|| {
                ToolError::execution(format!("the string '{query}' was not found on this page"))
            })?;

        // Viewports are ranges over the original content; map the match
        // back before locating it.
        let original = original_offset(&state.lower_starts, offset);
        let viewport = state
            .viewports
            .iter()
            .position(|&(start, end)| original >= start && original < end)
            .unwrap_or_else(|| state.viewports.len().saturating_sub(1));
        state.current_viewport = viewport;
        state.find_query = Some(query.to_owned());
        state.find_position = offset + needle.len().max(1);
        Ok(())
    }
}

/// Lowercase `content`, recording each original char's byte offset in both
/// the original and the lowercased copy.
fn lowercase_index(content: &str) -> (String, Vec<(usize, usize)>) {
    let mut lower = String::with_capacity(content.len());
    let mut starts = Vec::with_capacity(content.len());
    for (idx, ch) in content.char_indices() {
        starts.push((idx, lower.len()));
        lower.extend(ch.to_lowercase());
    }
    (lower, starts)
}

/// The lowercased-space offset corresponding to original-space `orig`.
fn lower_offset(starts: &[(usize, usize)], orig: usize) -> usize {
    match starts.binary_search_by_key(&orig, |&(o, _)| o) {
        Ok(i) => starts[i].1,
        Err(i) => starts.get(i.saturating_sub(1)).map_or(0, |&(_, l)| l),
    }
}

/// The original-space offset of the char containing lowercased-space `lower`.
fn original_offset(starts: &[(usize, usize)], lower: usize) -> usize {
    match starts.binary_search_by_key(&lower, |&(_, l)| l) {
        Ok(i) => starts[i].0,
        Err(i) => starts.get(i.saturating_sub(1)).map_or(0, |&(o, _)| o),
    }
}

/// Split content into viewport byte ranges of at most `size` characters,
/// respecting char boundaries.
fn paginate(content: &str, size: usize) -> Vec<(usize, usize)> {
    if content.is_empty() {
        return vec![(0, 0)];
    }
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut chars = 0;
    let mut end = 0;
    for (idx, ch) in content.char_indices() {
        if chars == size {
            ranges.push((start, idx));
            start = idx;
            chars = 0;
        }
        chars += 1;
        end = idx + ch.len_utf8();
    }
    ranges.push((start, end));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content: &str) -> Page {
        Page {
            url: "https://example.com".to_owned(),
            title: "Example".to_owned(),
            content: content.to_owned(),
        }
    }

    #[test]
    fn paginates_on_char_boundaries() {
        // 'é' is two bytes; a byte-based split would panic on slicing.
        let content = "ééééé";
        let ranges = paginate(content, 2);
        assert_eq!(ranges.len(), 3);
        for (start, end) in ranges {
            let _ = &content[start..end];
        }
    }

    #[test]
    fn viewport_navigation_clamps_at_bounds() {
        let session = BrowsingSession::new(4, "/tmp/downloads");
        session.set_page(page("abcdefghij"));

        let view = session.current_view().expect("view");
        assert!(view.contains("page 1 of 3"));
        assert!(view.ends_with("abcd"));

        session.page_down().expect("down");
        let view = session.page_down().expect("down");
        assert!(view.contains("page 3 of 3"));
        // Clamped at the last viewport.
        let view = session.page_down().expect("down");
        assert!(view.contains("page 3 of 3"));

        session.page_up().expect("up");
        session.page_up().expect("up");
        let view = session.page_up().expect("up");
        assert!(view.contains("page 1 of 3"));
    }

    #[test]
    fn find_jumps_to_the_matching_viewport() {
        let session = BrowsingSession::new(4, "/tmp/downloads");
        session.set_page(page("aaaabbbbNEEDLEcc"));

        let view = session.find("needle").expect("found");
        assert!(view.contains("page 3 of 4"));

        let err = session.find("absent").expect_err("not on page");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn find_next_advances_past_the_previous_match() {
        let session = BrowsingSession::new(4, "/tmp/downloads");
        session.set_page(page("xkey....key....."));

        let view = session.find("key").expect("first");
        assert!(view.contains("page 1 of 4"));
        let view = session.find_next().expect("second");
        assert!(view.contains("page 3 of 4"));
        let err = session.find_next().expect_err("no third occurrence");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn find_survives_case_mappings_that_change_byte_length() {
        // 'İ' lowercases to two chars with a different byte length, so
        // original-content offsets drift against the lowercased copy.
        let session = BrowsingSession::new(2, "/tmp/downloads");
        session.set_page(page("aİİb key"));
        session.page_down().expect("down");

        let view = session.find("KEY").expect("present later on the page");
        assert!(view.contains("page 3 of 4"));
    }

    #[test]
    fn fresh_page_resets_cursors_and_records_history() {
        let session = BrowsingSession::new(4, "/tmp/downloads");
        session.set_page(page("first page content"));
        session.page_down().expect("down");
        session.find("content").expect("find");

        let second = Page {
            url: "https://example.org".to_owned(),
            title: "Other".to_owned(),
            content: "tiny".to_owned(),
        };
        let view = session.set_page(second);
        assert!(view.contains("page 1 of 1"));
        assert!(session.find_next().is_err());
        assert_eq!(
            session.history(),
            vec!["https://example.com", "https://example.org"]
        );
    }

    #[test]
    fn view_before_any_visit_is_an_error() {
        let session = BrowsingSession::new(4, "/tmp/downloads");
        assert!(session.current_view().is_err());
        assert!(session.page_down().is_err());
        assert!(session.find("x").is_err());
    }
}
