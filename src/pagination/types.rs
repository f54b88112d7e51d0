//! Pagination types
//!
//! Caller policy, the driver's cursor state, and the continuation decision.

use crate::queue::PAGINATION_TOKEN_PARAM;
use serde::{Deserialize, Serialize};

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch another page with this cursor
    Continue(String),
    /// No more pages
    Done(StopReason),
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The server sent no continuation cursor
    Exhausted,
    /// Auto-continuation is off; the caller decides about further pages
    Manual,
    /// `max_pages` was reached
    PageLimit,
    /// `max_results` was reached
    ResultLimit,
    /// A page failed
    Failed,
    /// The consumer dropped the page stream
    Cancelled,
}

/// Caller policy for walking pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationPolicy {
    /// Follow continuation cursors automatically
    pub auto_continue: bool,
    /// Query parameter that carries the cursor
    pub token_param: String,
    /// Stop after this many pages
    pub max_pages: Option<u32>,
    /// Stop once at least this many results were received
    pub max_results: Option<u64>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            auto_continue: true,
            token_param: PAGINATION_TOKEN_PARAM.to_string(),
            max_pages: None,
            max_results: None,
        }
    }
}

impl PaginationPolicy {
    /// Policy that returns a single page and leaves continuation to the caller
    pub fn manual() -> Self {
        Self {
            auto_continue: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_auto_continue(mut self, auto_continue: bool) -> Self {
        self.auto_continue = auto_continue;
        self
    }

    #[must_use]
    pub fn with_token_param(mut self, param: impl Into<String>) -> Self {
        self.token_param = param.into();
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Pages received so far
    pub pages: u32,
    /// Cursor of the page currently being requested
    pub cursor: Option<String>,
    /// Results received so far
    pub total_fetched: u64,
    /// Set once pagination has stopped
    pub stop: Option<StopReason>,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state that starts from a known cursor
    pub fn with_cursor(cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..Self::default()
        }
    }

    /// Record one received page
    pub fn add_page(&mut self, results: u64) {
        self.pages += 1;
        self.total_fetched += results;
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self, reason: StopReason) {
        self.stop.get_or_insert(reason);
    }

    /// Is pagination complete?
    pub fn is_done(&self) -> bool {
        self.stop.is_some()
    }
}
