//! Transport and provider error types.
//!
//! These are the raw shapes the hosted backend and the HTTP stack produce.
//! Callers of the data-access layer never see them; they are normalized one
//! level up.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised before a response was received.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Failed to send the request.
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Could not connect to the backend.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Failed to parse response body.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::ParseError(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else if e.is_decode() {
            FetchError::ParseError(e.to_string())
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else {
            FetchError::RequestError(e.to_string())
        }
    }
}

/// An error reported by the provider in a non-2xx response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP {status} [{}]: {message}", .code.as_deref().unwrap_or("-"))]
pub struct ProviderError {
    /// HTTP status of the response.
    pub status: u16,
    /// Provider error code (`23505`, `PGRST116`, `invalid_credentials`, ...).
    pub code: Option<String>,
    /// Provider message, for logs only.
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

// The query, storage and identity services all shape their errors slightly
// differently; accept the union.
#[derive(Deserialize, Default)]
struct RawProviderError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl ProviderError {
    pub fn new(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.map(String::from),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Parse an error body. Bodies that are not JSON keep their text as the message.
    pub fn from_body(status: u16, body: &str) -> Self {
        let raw: RawProviderError = match serde_json::from_str(body) {
            Ok(raw) => raw,
            Err(_) => {
                return Self::new(status, None, body.trim());
            }
        };

        let code = raw
            .error_code
            .or_else(|| match raw.code {
                Some(serde_json::Value::String(s)) => Some(s),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .or_else(|| raw.error.clone().filter(|e| !e.contains(' ')));

        let message = raw
            .message
            .or(raw.msg)
            .or(raw.error_description)
            .or(raw.error)
            .unwrap_or_else(|| format!("HTTP {}", status));

        Self {
            status,
            code,
            message,
            details: raw.details,
            hint: raw.hint,
        }
    }

    /// Provider code, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Error type for every backend call.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The provider answered with an error.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No usable response.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl BackendError {
    /// Provider code, if the provider supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::Provider(e) => e.code(),
            BackendError::Fetch(_) => None,
        }
    }

    /// HTTP status, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Provider(e) => Some(e.status),
            BackendError::Fetch(_) => None,
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Fetch(e.into())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Fetch(e.into())
    }
}
