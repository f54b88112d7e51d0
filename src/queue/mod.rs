//! Request queue module
//!
//! Serialized, rate-limited execution of units of work.
//!
//! # Overview
//!
//! ```text
//!  QueueSender ──► [inbound] ──► RequestQueue::run ──► [outbound] ──► QueueReceiver
//!                                   │      ▲
//!                         throttled │      │ pending retries
//!                                   └──────┘
//! ```
//!
//! - Successes are forwarded, then the processor sleeps for `rate`.
//! - Throttling errors (420, 429, 5xx) are retried after `delay` and never
//!   reach the receiver while `auto_retry` is on.
//! - Any other error is forwarded once and stops the queue.

mod processor;
mod types;

pub use processor::{QueueReceiver, QueueSender, RequestQueue};
pub use types::{
    Completed, QueueConfig, QueueExit, QueueReport, UnitOfWork, DEFAULT_QUOTA_REQUESTS,
    DEFAULT_QUOTA_WINDOW, DEFAULT_RETRY_DELAY, PAGINATION_TOKEN_PARAM,
};
