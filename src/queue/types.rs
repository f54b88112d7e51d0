//! Queue types
//!
//! Units of work, queue configuration and the records a queue emits.

use crate::decode::Envelope;
use crate::error::{ApiError, Result};
use crate::http::HttpRequest;
use crate::types::{JsonValue, Method, StringMap};
use std::collections::BTreeMap;
use std::time::Duration;

/// Query parameter carrying the continuation cursor
pub const PAGINATION_TOKEN_PARAM: &str = "pagination_token";

/// Quota window the upstream API publishes its limits against
pub const DEFAULT_QUOTA_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Requests per window assumed when an endpoint has no known quota
pub const DEFAULT_QUOTA_REQUESTS: u32 = 15;

/// Backoff before re-attempting a throttled unit of work
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15 * 60);

// ============================================================================
// Unit of work
// ============================================================================

/// Description of one HTTP call
///
/// Values are immutable in use: query changes produce a new unit, so a unit
/// that is waiting in a queue never changes underneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOfWork {
    method: Method,
    target: String,
    query: BTreeMap<String, String>,
    headers: StringMap,
    body: Option<JsonValue>,
}

impl UnitOfWork {
    /// Create a unit for a URL or a path relative to the transport's base URL
    ///
    /// A query string already present on `target` is split off and merged
    /// into the unit's parameters.
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        Self {
            method,
            target: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            headers: StringMap::new(),
            body: None,
        }
    }

    /// Create a GET unit
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::GET, target)
    }

    /// Create a POST unit with a JSON body
    pub fn post(target: impl AsRef<str>, body: JsonValue) -> Self {
        Self::new(Method::POST, target).with_body(body)
    }

    /// Set or replace a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Set or replace a multi-valued query parameter (values joined with `,`)
    #[must_use]
    pub fn with_query_values<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.with_query(key, joined)
    }

    /// Merge several query parameters, replacing existing keys
    #[must_use]
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.query.insert(key.into(), value.into());
        }
        self
    }

    /// Set or replace the `pagination_token` parameter
    #[must_use]
    pub fn with_pagination_token(self, token: impl Into<String>) -> Self {
        self.with_query(PAGINATION_TOKEN_PARAM, token)
    }

    /// Add a request header
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target without the query string
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Current value of a query parameter
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// All query parameters, ordered by key
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    /// Target with the encoded query string
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.target.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{query}", self.target)
    }

    /// Build the transport request for this unit
    pub fn to_request(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(self.method, self.url());
        request.headers = self.headers.clone();

        if let Some(ref body) = self.body {
            request.body = Some(serde_json::to_vec(body)?.into());
            request
                .headers
                .entry("Content-Type".to_string())
                .or_insert_with(|| "application/json".to_string());
        } else if self.method == Method::POST {
            request
                .headers
                .insert("Content-Type".to_string(), "application/json".to_string());
        }

        Ok(request)
    }
}

// ============================================================================
// Queue configuration
// ============================================================================

/// Throttling and retry settings of one queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Minimum spacing after each successful dispatch
    pub rate: Duration,
    /// Pause after a throttled attempt before taking more work
    pub delay: Duration,
    /// Retry throttling errors instead of surfacing them
    pub auto_retry: bool,
    /// Cap on attempts of a single unit while auto-retrying (`None` = unbounded)
    pub max_attempts: Option<u32>,
    /// Capacity of the inbound and outbound channels
    pub buffer: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_quota(DEFAULT_QUOTA_REQUESTS, DEFAULT_QUOTA_WINDOW)
    }
}

impl QueueConfig {
    /// Derive the spacing from a published quota of `requests` per `window`
    pub fn from_quota(requests: u32, window: Duration) -> Self {
        Self {
            rate: window / requests.max(1),
            delay: DEFAULT_RETRY_DELAY,
            auto_retry: true,
            max_attempts: None,
            buffer: 1,
        }
    }

    #[must_use]
    pub fn with_rate(mut self, rate: Duration) -> Self {
        self.rate = rate;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_auto_retry(mut self, auto_retry: bool) -> Self {
        self.auto_retry = auto_retry;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the channel capacity (values below 1 are raised to 1)
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Whether a failed attempt should be retried
    pub(crate) fn should_retry(&self, error: &ApiError, attempts: u32) -> bool {
        self.auto_retry
            && error.is_retryable()
            && self.max_attempts.map_or(true, |max| attempts < max)
    }
}

// ============================================================================
// Queue output
// ============================================================================

/// A unit of work handed back together with its outcome
#[derive(Debug, Clone)]
pub struct Completed {
    pub work: UnitOfWork,
    pub outcome: std::result::Result<Envelope, ApiError>,
    /// Attempts spent on this unit, including retries
    pub attempts: u32,
}

impl Completed {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Why a queue processor stopped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueueExit {
    /// Every sender was dropped and all pending work was processed
    #[default]
    Drained,
    /// A non-retryable error was forwarded
    Failed(ApiError),
    /// The outbound receiver was dropped
    Abandoned,
}

/// Summary returned when a queue processor stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub exit: QueueExit,
    /// Transport calls made, including retries
    pub dispatched: u64,
    pub succeeded: u64,
    pub retried: u64,
}
