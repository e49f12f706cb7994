//! Error taxonomy shared by every capability and provider
//!
//! Errors are classified by a flat [`ErrorKind`] tag rather than by a type
//! hierarchy. Provider-fault refinements (rate limits, authentication, ...)
//! are still provider errors; see [`ErrorKind::is_provider_fault`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for normalization-layer operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Classification tag for an [`LlmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request shape problems caught before transport
    Validation,
    /// Missing or invalid credentials and settings
    Configuration,
    /// Capability not implemented by the bound adapter
    UnsupportedOperation,
    /// Generic vendor-side failure
    Provider,
    RateLimit,
    Authentication,
    QuotaExceeded,
    InvalidRequest,
    ContextLengthExceeded,
}

impl ErrorKind {
    /// Whether this kind is the generic provider tag or one of its refinements
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            Self::Provider
                | Self::RateLimit
                | Self::Authentication
                | Self::QuotaExceeded
                | Self::InvalidRequest
                | Self::ContextLengthExceeded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Configuration => "configuration",
            Self::UnsupportedOperation => "unsupported_operation",
            Self::Provider => "provider",
            Self::RateLimit => "rate_limit",
            Self::Authentication => "authentication",
            Self::QuotaExceeded => "quota_exceeded",
            Self::InvalidRequest => "invalid_request",
            Self::ContextLengthExceeded => "context_length_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by validation, dispatch, or provider error mapping
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{provider}] {kind} error: {message}")]
pub struct LlmError {
    /// Classification tag
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// Identity of the provider the error originated from
    pub provider: String,

    /// Vendor error code, when the vendor supplied one
    pub code: Option<String>,

    /// Original vendor error payload, retained for diagnostics
    pub raw: Option<Value>,

    /// Every problem found by validation (empty for other kinds)
    pub problems: Vec<String>,

    /// Wait suggested by the provider's `Retry-After` header
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: ErrorKind, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: provider.into(),
            code: None,
            raw: None,
            problems: Vec::new(),
            retry_after: None,
        }
    }

    /// Validation error listing every problem found
    pub fn validation(provider: impl Into<String>, problems: Vec<String>) -> Self {
        let message = format!("Invalid request: {}", problems.join("; "));
        Self {
            problems,
            ..Self::new(ErrorKind::Validation, provider, message)
        }
    }

    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, provider, message)
    }

    pub fn unsupported(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedOperation, provider, message)
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Provider, provider, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_provider_fault(&self) -> bool {
        self.kind.is_provider_fault()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_error_joins_problems() {
        let err = LlmError::validation(
            "openai",
            vec!["messages must not be empty".into(), "model is required".into()],
        );

        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.problems.len(), 2);
        assert!(err.message.contains("messages must not be empty; model is required"));
        assert_eq!(
            err.to_string(),
            "[openai] validation error: Invalid request: messages must not be empty; model is required"
        );
    }

    #[test]
    fn test_provider_refinements_are_provider_faults() {
        assert!(ErrorKind::RateLimit.is_provider_fault());
        assert!(ErrorKind::ContextLengthExceeded.is_provider_fault());
        assert!(ErrorKind::Provider.is_provider_fault());
        assert!(!ErrorKind::Validation.is_provider_fault());
        assert!(!ErrorKind::UnsupportedOperation.is_provider_fault());
    }

    #[test]
    fn test_raw_payload_is_retained() {
        let raw = json!({"error": {"message": "boom"}});
        let err = LlmError::provider("gemini", "boom")
            .with_code("INTERNAL")
            .with_raw(raw.clone());

        assert_eq!(err.code.as_deref(), Some("INTERNAL"));
        assert_eq!(err.raw, Some(raw));
        assert_eq!(err.provider, "gemini");
    }
}
