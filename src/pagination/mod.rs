//! Pagination module
//!
//! Walks cursor-paginated endpoints on top of a [`RequestQueue`].
//!
//! # Overview
//!
//! ```text
//!   caller ──paginate(work)──▶ relay ──enqueue──▶ RequestQueue ──▶ Transport
//!     ▲                          │  ◀──completed──┘
//!     │                          │
//!     └──── pages / error ◀──────┘  (next unit = work + pagination_token)
//! ```
//!
//! Each page's `meta.next_token` decides whether another unit is submitted.
//! The original unit is used as a template, so earlier pages are never
//! mutated and the walk can be resumed from any cursor.
//!
//! [`RequestQueue`]: crate::queue::RequestQueue

mod driver;
mod strategies;
mod types;

pub use driver::{PageStream, PaginationDriver};
pub use strategies::CursorPaginator;
pub use types::{NextPage, PaginationPolicy, PaginationState, StopReason};
