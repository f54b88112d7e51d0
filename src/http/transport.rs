//! Transport abstractions
//!
//! Boundary between the orchestration core and whatever performs HTTP calls.

use crate::error::Result;
use crate::types::{Method, StringMap};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A fully formed outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the query string, or a path relative to the
    /// transport's base URL
    pub url: String,
    pub headers: StringMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: StringMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the raw body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A buffered response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of an open streaming response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Performs one HTTP call and buffers the response
///
/// Implementations return `Err` only for transport-level failures
/// (connect, TLS, timeout). Non-2xx statuses are ordinary responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Opens a long-lived response and hands back its body
///
/// Unlike [`Transport`], a non-2xx status is a failed handshake and must be
/// returned as an error carrying the status.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, request: &HttpRequest) -> Result<ByteStream>;
}
