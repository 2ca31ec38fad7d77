mod classify;

pub use classify::*;

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailure {
    Connect,
    Timeout,
    Reset,
    Protocol,
    Tls,
    Unknown,
}

/// How strongly a failure should count against an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network errors, timeouts, generic non-2xx responses.
    Ordinary,
    /// 429/503 or an explicit provider throttling signal.
    Throttled,
}

/// Failure reported by a caller-supplied operation for a single attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("transport failure ({kind:?}): {message}")]
    Transport {
        kind: TransportFailure,
        message: String,
    },

    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    #[error("rate limited by upstream")]
    RateLimited { retry_after: Option<Duration> },

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    pub fn transport(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn class(&self) -> FailureClass {
        match self {
            UpstreamError::RateLimited { .. } => FailureClass::Throttled,
            UpstreamError::HttpStatus(429 | 503) => FailureClass::Throttled,
            _ => FailureClass::Ordinary,
        }
    }

    /// Provider hint for how long to stay away, when one was given.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            UpstreamError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
