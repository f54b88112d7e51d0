//! HTTP transport module
//!
//! The orchestration core never talks to `reqwest` directly. It is handed a
//! [`Transport`] (one request, one buffered response) and, for streaming, a
//! [`StreamConnector`] (one request, one open body). [`HttpTransport`]
//! implements both on top of `reqwest`.
//!
//! # Features
//!
//! - **Pre-authorized requests**: default headers are attached to every call
//! - **Optional request cap**: a token bucket shared by every caller of one transport
//! - **Streaming bodies**: the connection stays open and is read chunk by chunk

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpTransport, HttpTransportConfig, HttpTransportConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::{ByteStream, HttpRequest, HttpResponse, StreamConnector, Transport};
