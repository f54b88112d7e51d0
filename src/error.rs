//! Error types for pagewalk
//!
//! Two layers live here:
//!
//! - [`Error`] is the crate-wide error returned by fallible APIs
//!   (configuration, transport, channel plumbing).
//! - [`ApiError`] is the classified `{code, message}` pair that is published
//!   on page and event sequences. `code == 0` means the failure did not come
//!   from an HTTP status (transport or decode failure).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator used when a status is embedded in an error string (`"<message> - <code>"`)
const CODE_SEPARATOR: &str = " - ";

/// The main error type for pagewalk
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{body} - {status}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("Request queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Api(#[from] ApiError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        ApiError::from_error(self).is_retryable()
    }
}

/// Result type alias for pagewalk
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Classified API errors
// ============================================================================

/// A failure reduced to a numeric code and a message
///
/// Nonzero codes mirror HTTP status codes. Zero marks transport and decode
/// failures that carried no recoverable status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}{CODE_SEPARATOR}{}", self.message, self.code)
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create an error with an explicit code
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Classify an HTTP status failure
    pub fn from_status(status: u16, status_text: impl Into<String>) -> Self {
        Self::new(status, status_text)
    }

    /// Classify a transport or decode error message.
    ///
    /// Lower layers sometimes fold the HTTP status into the error text as
    /// `"<message> - <code>"`. The trailing token after the last `" - "` is
    /// parsed as the code and the text before the first separator becomes the
    /// message. Without a parseable trailing code the result is `code == 0`
    /// with the text kept verbatim.
    pub fn classify(text: &str) -> Self {
        let parts: Vec<&str> = text.split(CODE_SEPARATOR).collect();
        if parts.len() > 1 {
            if let Some(code) = parts
                .last()
                .and_then(|last| last.trim().parse::<u16>().ok())
            {
                return Self::new(code, parts[0]);
            }
        }
        Self::new(0, text)
    }

    /// Classify a crate error, keeping structured status codes when present
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Api(api) => api.clone(),
            Error::HttpStatus { status, body } => Self::new(*status, body.clone()),
            Error::Http(e) => match e.status() {
                Some(status) => Self::new(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default(),
                ),
                None => Self::new(0, e.to_string()),
            },
            other => Self::classify(&other.to_string()),
        }
    }

    /// Create a decode failure (always code 0)
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// True when the failure did not come from an HTTP status
    pub fn is_transport(&self) -> bool {
        self.code == 0
    }

    /// Check if this error signals throttling or server overload
    pub fn is_retryable(&self) -> bool {
        is_retryable_code(self.code)
    }
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        Self::from_error(err)
    }
}

/// Check if a code belongs to the retryable set `{420, 429} ∪ [500, 599]`
pub fn is_retryable_code(code: u16) -> bool {
    matches!(code, 420 | 429 | 500..=599)
}

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
