//! Client configuration
//!
//! Settings for the transport, the request queues, pagination and streaming,
//! loadable from YAML or JSON.

use crate::endpoints::{Endpoint, Quota};
use crate::error::{Error, Result};
use crate::http::{HttpTransportConfig, RateLimiterConfig};
use crate::pagination::PaginationPolicy;
use crate::queue::{QueueConfig, DEFAULT_RETRY_DELAY};
use crate::stream::StreamConfig;
use crate::types::OptionStringExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for API requests
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for buffered requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Headers sent with every request (e.g. a pre-authorized `Authorization`)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Optional transport-wide request cap
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Request queue settings
    #[serde(default)]
    pub queue: QueueSettings,

    /// Pagination policy
    #[serde(default)]
    pub pagination: PaginationPolicy,

    /// Stream reader settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Quota overrides keyed by endpoint name
    #[serde(default)]
    pub quotas: HashMap<Endpoint, Quota>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: None,
            headers: HashMap::new(),
            rate_limit: None,
            queue: QueueSettings::default(),
            pagination: PaginationPolicy::default(),
            stream: StreamConfig::default(),
            quotas: HashMap::new(),
        }
    }
}

// ============================================================================
// Queue Settings
// ============================================================================

/// Queue settings shared by every endpoint; the rate comes from the quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Backoff after a throttled attempt, in seconds
    #[serde(default = "default_delay")]
    pub delay_secs: u64,

    /// Retry throttling errors
    #[serde(default = "default_auto_retry")]
    pub auto_retry: bool,

    /// Cap on attempts of one request while retrying
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Channel capacity
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_delay() -> u64 {
    DEFAULT_RETRY_DELAY.as_secs()
}

fn default_auto_retry() -> bool {
    true
}

fn default_buffer() -> usize {
    1
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            delay_secs: default_delay(),
            auto_retry: default_auto_retry(),
            max_attempts: None,
            buffer: default_buffer(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ClientConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be positive"));
        }
        if self.queue.buffer == 0 {
            return Err(Error::invalid_value("queue.buffer", "must be at least 1"));
        }
        if self.queue.max_attempts == Some(0) {
            return Err(Error::invalid_value("queue.max_attempts", "must be at least 1"));
        }
        if self.stream.buffer == 0 {
            return Err(Error::invalid_value("stream.buffer", "must be at least 1"));
        }
        if self.pagination.token_param.trim().is_empty() {
            return Err(Error::invalid_value("pagination.token_param", "must not be empty"));
        }
        if self.pagination.max_pages == Some(0) {
            return Err(Error::invalid_value("pagination.max_pages", "must be at least 1"));
        }

        for (endpoint, quota) in &self.quotas {
            if quota.requests == 0 || quota.window_secs == 0 {
                return Err(Error::invalid_value(
                    format!("quotas.{endpoint}"),
                    "requests and window_secs must be positive",
                ));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Transport settings
    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut builder = HttpTransportConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));

        if let Some(agent) = self.user_agent.clone().none_if_empty() {
            builder = builder.user_agent(agent);
        }
        if let Some(ref limit) = self.rate_limit {
            builder = builder.rate_limit(limit.clone());
        }
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        builder.build()
    }

    /// Effective quota of an endpoint, overrides first
    pub fn quota(&self, endpoint: Endpoint) -> Quota {
        self.quotas
            .get(&endpoint)
            .copied()
            .unwrap_or_else(|| endpoint.quota())
    }

    /// Queue settings for an endpoint
    pub fn queue_config(&self, endpoint: Endpoint) -> QueueConfig {
        let mut config = self
            .quota(endpoint)
            .queue_config()
            .with_delay(Duration::from_secs(self.queue.delay_secs))
            .with_auto_retry(self.queue.auto_retry)
            .with_buffer(self.queue.buffer);
        config.max_attempts = self.queue.max_attempts;
        config
    }

    pub fn pagination_policy(&self) -> PaginationPolicy {
        self.pagination.clone()
    }

    pub fn stream_config(&self) -> StreamConfig {
        self.stream.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MalformedFrames;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.queue.delay_secs, 900);
        assert!(config.queue.auto_retry);
        assert!(config.pagination.auto_continue);
        assert_eq!(config.stream.malformed_frames, MalformedFrames::Skip);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
base_url: https://api.example.com
timeout_secs: 5
headers:
  Authorization: Bearer abc
rate_limit:
  requests_per_second: 2
queue:
  delay_secs: 60
  max_attempts: 3
pagination:
  max_pages: 10
stream:
  malformed_frames: terminate
quotas:
  user_followers:
    requests: 30
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.headers.get("Authorization").unwrap(), "Bearer abc");
        assert_eq!(config.rate_limit.as_ref().unwrap().burst_size, 1);
        assert_eq!(config.queue.max_attempts, Some(3));
        assert!(config.queue.auto_retry);
        assert_eq!(config.pagination.max_pages, Some(10));
        assert_eq!(config.stream.malformed_frames, MalformedFrames::Terminate);

        let followers = config.queue_config(Endpoint::UserFollowers);
        assert_eq!(followers.rate, Duration::from_secs(30));
        assert_eq!(followers.delay, Duration::from_secs(60));
        assert_eq!(followers.max_attempts, Some(3));

        let tweets = config.queue_config(Endpoint::UserTweets);
        assert_eq!(tweets.rate, Duration::from_millis(600));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"base_url": "http://localhost:8080", "queue": {"auto_retry": false}}"#;
        let config = ClientConfig::from_json_str(json).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(!config.queue_config(Endpoint::RecentSearch).auto_retry);
    }

    #[test]
    fn test_validation_errors() {
        let err = ClientConfig::from_yaml_str("base_url: not a url\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "base_url"));

        let err = ClientConfig::from_yaml_str("queue:\n  buffer: 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "queue.buffer"));

        let err = ClientConfig::from_yaml_str("quotas:\n  user_tweets:\n    requests: 0\n").unwrap_err();
        assert!(err.to_string().contains("quotas.user_tweets"));

        let err = ClientConfig::from_yaml_str("quotas:\n  home_timeline:\n    requests: 1\n").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_transport_config() {
        let config = ClientConfig::from_yaml_str(
            "base_url: https://api.example.com\nuser_agent: tester/1.0\nheaders:\n  X-Trace: enabled\n",
        )
        .unwrap();
        let transport = config.transport_config();

        assert_eq!(transport.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(transport.user_agent, "tester/1.0");
        assert_eq!(transport.timeout, Duration::from_secs(30));
        assert_eq!(transport.default_headers.get("X-Trace").unwrap(), "enabled");
        assert!(transport.rate_limit.is_none());

        let blank_agent = ClientConfig::from_yaml_str("user_agent: \"\"\n").unwrap();
        assert!(blank_agent.transport_config().user_agent.starts_with("pagewalk/"));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("client.yaml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "timeout_secs: 7").unwrap();
        assert_eq!(ClientConfig::load(&yaml_path).unwrap().timeout_secs, 7);

        let json_path = dir.path().join("client.json");
        std::fs::write(&json_path, r#"{"timeout_secs": 9}"#).unwrap();
        assert_eq!(ClientConfig::load(&json_path).unwrap().timeout_secs, 9);

        let missing = ClientConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, Error::FileNotFound { .. }));
    }
}
