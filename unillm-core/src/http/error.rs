//! Transport errors and vendor error-body parsing

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by a [`Transport`](super::Transport).
///
/// The dispatcher never inspects these; adapters classify them in
/// `map_error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The provider answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        body: Value,
        retry_after: Option<Duration>,
    },

    /// No response was received (connect failure, timeout, reset)
    #[error("no response from provider: {message}")]
    NoResponse { message: String, timed_out: bool },

    /// A response arrived but did not have the expected shape
    #[error("failed to decode response: {message}")]
    Decode { message: String, body: Option<Value> },

    /// The event stream broke after it started
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw payload associated with the error, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::Decode { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Error details extracted from a vendor error body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetails {
    pub message: String,
    /// `error.type` (OpenAI, Anthropic)
    pub error_type: Option<String>,
    /// `error.code` rendered as a string
    pub code: Option<String>,
    /// `error.status` (Gemini)
    pub status: Option<String>,
}

/// Extract error details from a JSON error body
pub fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // Gemini occasionally wraps the error object in a one-element array
    if let Some(first) = json.as_array().and_then(|items| items.first()) {
        return extract_error_details(first);
    }

    let as_string = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    // { "error": { "message": "...", "type": "...", "code": "...", "status": "..." } }
    if let Some(error) = json.get("error").filter(|e| e.is_object()) {
        let message = error.get("message").and_then(Value::as_str)?;
        return Some(ErrorDetails {
            message: message.to_string(),
            error_type: error.get("type").and_then(as_string),
            code: error.get("code").and_then(as_string),
            status: error.get("status").and_then(as_string),
        });
    }

    if let Some(message) = json.get("message").and_then(Value::as_str) {
        return Some(ErrorDetails {
            message: message.to_string(),
            error_type: json.get("type").and_then(as_string),
            code: json.get("code").and_then(as_string),
            status: None,
        });
    }

    if let Some(error) = json.get("error").and_then(Value::as_str) {
        return Some(ErrorDetails {
            message: error.to_string(),
            ..ErrorDetails::default()
        });
    }

    None
}

/// Parse a JSON body, keeping unparseable text as a JSON string
pub fn body_to_value(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Parse Retry-After header value
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    header_value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_openai_error() {
        let details = extract_error_details(&json!({
            "error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}
        }))
        .unwrap();
        assert_eq!(details.message, "Rate limit reached");
        assert_eq!(details.error_type.as_deref(), Some("requests"));
        assert_eq!(details.code.as_deref(), Some("rate_limit_exceeded"));
    }

    #[test]
    fn test_extract_anthropic_error() {
        let details = extract_error_details(&json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap();
        assert_eq!(details.error_type.as_deref(), Some("overloaded_error"));
    }

    #[test]
    fn test_extract_gemini_error_in_array() {
        let details = extract_error_details(&json!([{
            "error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}
        }]))
        .unwrap();
        assert_eq!(details.code.as_deref(), Some("429"));
        assert_eq!(details.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_unrecognized_body() {
        assert_eq!(extract_error_details(&json!({"foo": 1})), None);
        assert_eq!(body_to_value("<html>"), Value::String("<html>".into()));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("20"), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
