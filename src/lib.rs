// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagewalk
//!
//! Quota-aware access to cursor-paginated and streaming HTTP APIs.
//!
//! ## Features
//!
//! - **Request queue**: serial dispatch spaced by a published quota, with
//!   throttled requests (420, 429, 5xx) retried after a backoff
//! - **Cursor pagination**: follows `meta.next_token` until the server stops
//!   sending one, or hands single pages back for manual continuation
//! - **Streaming**: newline-delimited JSON frames decoded into typed events,
//!   with heartbeats skipped and cooperative stop
//! - **Error classification**: every failure reduced to `{code, message}`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewalk::{ApiClient, ClientConfig, Endpoint};
//!
//! #[tokio::main]
//! async fn main() -> pagewalk::Result<()> {
//!     let config = ClientConfig::from_yaml_str(
//!         "headers:\n  Authorization: Bearer <token>\n",
//!     )?;
//!     let client = ApiClient::new(config)?;
//!
//!     let mut pages = client.paginate(
//!         Endpoint::UserFollowers,
//!         &["44142397"],
//!         [("max_results", "1000")],
//!     )?;
//!     while let Some(page) = pages.next_page().await {
//!         println!("{} followers", page.record_count());
//!     }
//!     if let Some(err) = pages.next_error().await {
//!         eprintln!("stopped: {err}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ApiClient                              │
//! │  paginate() → PageStream   fetch() → Envelope   stream() → Session│
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────┬──────────────┴──┬───────────────┬──────────────┐
//! │  Pagination   │  RequestQueue   │    Stream     │   Decode     │
//! ├───────────────┼─────────────────┼───────────────┼──────────────┤
//! │ Cursor relay  │ Quota spacing   │ Line framing  │ Envelope     │
//! │ Page limits   │ Retry on 429    │ Event decode  │ Meta/Includes│
//! └───────────────┴────────┬────────┴───────┬───────┴──────────────┘
//!                          │                │
//!                   Transport (execute)  StreamConnector (connect)
//!                          └───── HttpTransport (reqwest) ─────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and failure classification
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP transport with optional request cap
pub mod http;

/// Response envelope and line framing
pub mod decode;

/// Rate-limited, retrying request queue
pub mod queue;

/// Cursor pagination driver
pub mod pagination;

/// Line-delimited JSON streaming
pub mod stream;

/// Endpoint catalog and quotas
pub mod endpoints;

/// Client configuration
pub mod config;

/// Client facade
pub mod client;

/// Logging setup
pub mod telemetry;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::ApiClient;
pub use config::ClientConfig;
pub use decode::{Envelope, Includes, Meta};
pub use endpoints::{Endpoint, Quota};
pub use error::{ApiError, Error, Result};
pub use http::{HttpTransport, HttpTransportConfig, StreamConnector, Transport};
pub use pagination::{PageStream, PaginationDriver, PaginationPolicy};
pub use queue::{QueueConfig, RequestQueue, UnitOfWork};
pub use stream::{MalformedFrames, StreamConfig, StreamEvent, StreamReader, StreamSession};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
