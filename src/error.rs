//! Error handling and custom error types
//!
//! `Error` covers setup and input problems that abort before or outside a
//! dispatch. `BackendError` is the classified failure a single backend call
//! hands back to the dispatcher.

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result of one backend call.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// How a backend failure should be treated by the failover loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Quota or rate limit exhausted (HTTP 429).
    RateLimited,
    /// Server-side fault (HTTP 5xx).
    ServerFault,
    /// Everything else: bad request, auth, policy rejection, transport or
    /// decoding failures.
    Rejected,
}

impl BackendErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerFault)
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::ServerFault => write!(f, "server fault"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A classified failure from one backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("backend {backend} {kind}: {message}")]
pub struct BackendError {
    pub backend: String,
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(backend: impl Into<String>, kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, BackendErrorKind::RateLimited, message)
    }

    pub fn server_fault(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, BackendErrorKind::ServerFault, message)
    }

    pub fn rejected(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(backend, BackendErrorKind::Rejected, message)
    }

    /// Classify a non-success HTTP status.
    ///
    /// Only 429 and 5xx are retryable; every other status is a rejection.
    pub fn from_status(backend: impl Into<String>, status: StatusCode, body: &str) -> Self {
        let message = format!("API error (status {}): {}", status, body);
        let kind = if status == StatusCode::TOO_MANY_REQUESTS {
            BackendErrorKind::RateLimited
        } else if status.is_server_error() {
            BackendErrorKind::ServerFault
        } else {
            BackendErrorKind::Rejected
        };
        Self::new(backend, kind, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limited() {
        let err = BackendError::from_status("openai:gpt-4o", StatusCode::TOO_MANY_REQUESTS, "quota");
        assert_eq!(err.kind, BackendErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert!(err.message.contains("quota"));
    }

    #[test]
    fn test_status_5xx_is_server_fault() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let err = BackendError::from_status("gemini:gemini-1.5-pro", status, "");
            assert_eq!(err.kind, BackendErrorKind::ServerFault);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_other_statuses_are_not_retryable() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::PAYLOAD_TOO_LARGE,
        ] {
            let err = BackendError::from_status("anthropic:claude", status, "nope");
            assert_eq!(err.kind, BackendErrorKind::Rejected);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_display_names_backend_and_kind() {
        let err = BackendError::rate_limited("openai:gpt-4o", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "backend openai:gpt-4o rate limited: quota exceeded"
        );
    }
}
