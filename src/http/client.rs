//! reqwest-backed transport
//!
//! Provides the HTTP capability the queue and the stream reader consume:
//! - Base URL resolution for relative paths
//! - Default (pre-authorized) headers on every request
//! - Optional process-wide request cap
//! - Buffered responses for paginated calls, open bodies for streams

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::transport::{ByteStream, HttpRequest, HttpResponse, StreamConnector, Transport};
use crate::error::{Error, Result};
use crate::types::StringMap;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Timeout for buffered requests (never applied to streams)
    pub timeout: Duration,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Optional request cap shared by every caller of this transport
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            rate_limit: None,
            default_headers: StringMap::new(),
            user_agent: format!("pagewalk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpTransportConfig {
    /// Create a new config builder
    pub fn builder() -> HttpTransportConfigBuilder {
        HttpTransportConfigBuilder::default()
    }
}

/// Builder for HTTP transport config
#[derive(Default)]
pub struct HttpTransportConfigBuilder {
    config: HttpTransportConfig,
}

impl HttpTransportConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Cap the request rate of this transport
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Add a bearer token obtained elsewhere
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("Authorization", value)
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpTransportConfig {
        self.config
    }
}

/// HTTP transport backed by reqwest
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpTransport {
    /// Create a transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        // No client-wide timeout: it would also cut off long-lived stream bodies.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Check if a request cap is configured
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Resolve a request URL against the base URL
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = url.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => url.to_string(),
        }
    }

    async fn send(&self, request: &HttpRequest) -> Result<reqwest::Response> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let url = self.resolve_url(&request.url);
        let mut req = self.client.request(request.method.into(), &url);
        req = self.apply_headers(req, &request.headers);
        if let Some(ref body) = request.body {
            req = req.body(body.clone());
        }

        debug!("Sending {} {}", request.method, url);
        Ok(req.send().await?)
    }

    fn apply_headers(&self, mut req: RequestBuilder, headers: &StringMap) -> RequestBuilder {
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = tokio::time::timeout(self.config.timeout, async {
            let response = self.send(request).await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, Error>((status, body))
        })
        .await
        .map_err(|_| {
            Error::Other(format!(
                "request timed out after {}ms",
                self.config.timeout.as_millis()
            ))
        })??;

        let (status, body) = response;
        debug!("Response {} for {}", status.as_u16(), request.url);
        Ok(HttpResponse::new(status.as_u16(), status_text(status), body))
    }
}

#[async_trait]
impl StreamConnector for HttpTransport {
    async fn connect(&self, request: &HttpRequest) -> Result<ByteStream> {
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), status_text(status)));
        }

        debug!("Stream opened: {}", request.url);
        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(Error::from)),
        ))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Reason phrase for a status, falling back to the numeric form
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), str::to_string)
}
