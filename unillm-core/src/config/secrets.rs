//! Secrets handling and redaction
//!
//! Credentials are wrapped in [`SecretString`], which never prints its value.
//! Header, query and JSON payload values are redacted by field name before
//! they reach a log line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Replacement used when masking JSON payload fields
pub const MASK: &str = "***";

/// A wrapper type for sensitive strings like API keys
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Get a partially redacted version for debugging
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let len = self.value.len();
        if len <= 8 || !self.value.is_ascii() {
            "[REDACTED]".to_string()
        } else if self.value.starts_with("sk-") {
            format!("{}...{}", &self.value[..3], &self.value[len - 4..])
        } else {
            format!("{}...{}", &self.value[..2], &self.value[len - 2..])
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Redaction policy for header and query values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedactionPolicy {
    /// Fully redact all sensitive fields
    #[default]
    Full,
    /// Show a short prefix for debugging
    Partial,
    /// No redaction (only for secure environments)
    None,
}

static REDACTION_POLICY: AtomicU8 = AtomicU8::new(0);

/// Set the process-wide redaction policy
pub fn set_redaction_policy(policy: RedactionPolicy) {
    let value = match policy {
        RedactionPolicy::Full => 0,
        RedactionPolicy::Partial => 1,
        RedactionPolicy::None => 2,
    };
    REDACTION_POLICY.store(value, Ordering::Relaxed);
}

pub fn get_redaction_policy() -> RedactionPolicy {
    match REDACTION_POLICY.load(Ordering::Relaxed) {
        1 => RedactionPolicy::Partial,
        2 => RedactionPolicy::None,
        _ => RedactionPolicy::Full,
    }
}

/// Whether a header, query or JSON field name carries a credential
pub fn is_sensitive_field(field_name: &str) -> bool {
    let name = field_name.to_lowercase().replace('-', "_");
    matches!(
        name.as_str(),
        "key" | "api_key" | "token" | "password" | "secret" | "authorization"
    ) || ["_key", "_token", "_secret", "_password"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Redact a string based on its field name
pub fn redact_by_field_name(field_name: &str, value: &str) -> String {
    if !is_sensitive_field(field_name) {
        return value.to_string();
    }

    match get_redaction_policy() {
        RedactionPolicy::Full => "[REDACTED]".to_string(),
        RedactionPolicy::Partial => match value.get(..2) {
            Some(prefix) if value.len() > 4 => format!("{prefix}..."),
            _ => "[REDACTED]".to_string(),
        },
        RedactionPolicy::None => value.to_string(),
    }
}

/// Copy of `value` with every sensitive object field replaced by [`MASK`]
pub fn mask_sensitive_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if is_sensitive_field(k) {
                        Value::String(MASK.to_string())
                    } else {
                        mask_sensitive_fields(v)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive_fields).collect()),
        other => other.clone(),
    }
}
