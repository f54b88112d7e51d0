//! Cursor pagination strategy
//!
//! Decides after each page whether to request another one.

use super::types::{NextPage, PaginationPolicy, PaginationState, StopReason};
use crate::decode::Envelope;

/// Cursor-based pagination driven by `meta.next_token`
///
/// The presence of a non-empty cursor is the only continuation signal; the
/// caller policy can stop earlier but never later.
#[derive(Debug, Clone, Default)]
pub struct CursorPaginator {
    pub policy: PaginationPolicy,
}

impl CursorPaginator {
    /// Create a new cursor paginator
    pub fn new(policy: PaginationPolicy) -> Self {
        Self { policy }
    }

    /// Record a received page and compute the next step
    pub fn process_page(&self, envelope: &Envelope, state: &mut PaginationState) -> NextPage {
        state.add_page(results_in(envelope));

        let next = self.decide(envelope, state);
        match &next {
            NextPage::Continue(token) => state.set_cursor(token.clone()),
            NextPage::Done(reason) => state.mark_done(*reason),
        }
        next
    }

    fn decide(&self, envelope: &Envelope, state: &PaginationState) -> NextPage {
        let Some(token) = envelope.next_token() else {
            return NextPage::Done(StopReason::Exhausted);
        };

        if !self.policy.auto_continue {
            return NextPage::Done(StopReason::Manual);
        }

        if self
            .policy
            .max_pages
            .is_some_and(|max| state.pages >= max)
        {
            return NextPage::Done(StopReason::PageLimit);
        }

        if self
            .policy
            .max_results
            .is_some_and(|max| state.total_fetched >= max)
        {
            return NextPage::Done(StopReason::ResultLimit);
        }

        NextPage::Continue(token.to_string())
    }
}

/// Results in a page: the server's count when given, else the payload size
fn results_in(envelope: &Envelope) -> u64 {
    match envelope.meta.result_count {
        0 => envelope.record_count() as u64,
        count => count,
    }
}
