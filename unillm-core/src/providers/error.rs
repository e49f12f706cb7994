//! Transport failure classification shared by every adapter
//!
//! Each adapter supplies only the vendor-specific part: a function from the
//! HTTP status and parsed error body to an [`ErrorKind`]. Everything without
//! a status (timeouts, broken streams, undecodable bodies) is a provider
//! error regardless of vendor.

use crate::error::{ErrorKind, LlmError};
use crate::http::{extract_error_details, ErrorDetails, TransportError};

/// Convert a transport failure into an [`LlmError`] for `provider`
pub fn map_transport_error<F>(provider: &str, error: TransportError, classify: F) -> LlmError
where
    F: FnOnce(u16, Option<&ErrorDetails>) -> ErrorKind,
{
    match error {
        TransportError::Status {
            status,
            body,
            retry_after,
        } => {
            let details = extract_error_details(&body);
            let kind = classify(status, details.as_ref());
            let message = details
                .as_ref()
                .map(|d| d.message.clone())
                .unwrap_or_else(|| format!("HTTP {}", status));
            // Numeric codes (Gemini) only repeat the HTTP status
            let code = details
                .as_ref()
                .and_then(|d| {
                    d.code
                        .clone()
                        .filter(|c| c.parse::<u16>().is_err())
                        .or_else(|| d.error_type.clone())
                        .or_else(|| d.status.clone())
                })
                .unwrap_or_else(|| status.to_string());

            let err = LlmError::new(kind, provider, message)
                .with_code(code)
                .with_raw(body);
            match retry_after {
                Some(wait) => err.with_retry_after(wait),
                None => err,
            }
        }
        TransportError::NoResponse { message, timed_out } => {
            LlmError::provider(provider, format!("no response from provider: {}", message))
                .with_code(if timed_out { "timeout" } else { "no_response" })
        }
        TransportError::Decode { message, body } => {
            let err = LlmError::provider(provider, format!("failed to decode response: {}", message))
                .with_code("decode");
            match body {
                Some(body) => err.with_raw(body),
                None => err,
            }
        }
        TransportError::Stream(message) => {
            LlmError::provider(provider, format!("stream interrupted: {}", message)).with_code("stream")
        }
        TransportError::InvalidRequest(message) => {
            LlmError::provider(provider, message).with_code("transport")
        }
    }
}

/// Status-only classification used when the body has nothing better
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::Authentication,
        429 => ErrorKind::RateLimit,
        400 | 404 | 409 | 413 | 422 => ErrorKind::InvalidRequest,
        _ => ErrorKind::Provider,
    }
}
