use crate::upstream::{TransportFailure, UpstreamError};
use http::StatusCode;
use http::header::RETRY_AFTER;
use std::time::Duration;

/// Map a response status onto the router's failure taxonomy.
///
/// 2xx is success. 429 becomes `RateLimited`, everything else keeps its code so
/// that 503 is still recognised as a throttling signal.
pub fn classify_status(status: StatusCode) -> Result<(), UpstreamError> {
    if status.is_success() {
        return Ok(());
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(UpstreamError::RateLimited { retry_after: None });
    }

    Err(UpstreamError::HttpStatus(status.as_u16()))
}

/// Pass a successful response through, or turn it into an `UpstreamError`.
/// Honors `Retry-After` (delta-seconds form) on 429 and 503.
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let err = match classify_status(resp.status()) {
        Ok(()) => return Ok(resp),
        Err(err) => err,
    };

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    Err(match err {
        UpstreamError::RateLimited { .. } => UpstreamError::RateLimited { retry_after },
        UpstreamError::HttpStatus(503) if retry_after.is_some() => {
            UpstreamError::RateLimited { retry_after }
        }
        other => other,
    })
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return match classify_status(status) {
                Err(err) => err,
                Ok(()) => UpstreamError::other(e.to_string()),
            };
        }

        let kind = if e.is_timeout() {
            TransportFailure::Timeout
        } else if e.is_connect() {
            TransportFailure::Connect
        } else if e.is_body() || e.is_decode() {
            TransportFailure::Protocol
        } else if e.is_request() {
            TransportFailure::Reset
        } else {
            TransportFailure::Unknown
        };

        UpstreamError::transport(kind, e.to_string())
    }
}
