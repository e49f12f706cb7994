//! Configuration schema
//!
//! A configuration file names credentials and connection settings per
//! provider. Every section is optional; credentials missing from the file can
//! still be supplied through [`EnvCredentials`](super::EnvCredentials).

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Supported configuration version
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnillmConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for UnillmConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            providers: ProvidersConfig::default(),
            http: HttpSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Known provider identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    pub fn all() -> [ProviderType; 3] {
        [Self::OpenAI, Self::Anthropic, Self::Gemini]
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-provider settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<ProviderSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<ProviderSettings>,
}

impl ProvidersConfig {
    pub fn get(&self, provider: ProviderType) -> Option<&ProviderSettings> {
        match provider {
            ProviderType::OpenAI => self.openai.as_ref(),
            ProviderType::Anthropic => self.anthropic.as_ref(),
            ProviderType::Gemini => self.gemini.as_ref(),
        }
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProviderSettings> {
        [&mut self.openai, &mut self.anthropic, &mut self.gemini]
            .into_iter()
            .flatten()
    }
}

/// Credentials and endpoint overrides for one provider
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// API key (supports `${ENV_VAR}` interpolation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Organization id sent with OpenAI requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Vendor API version (Anthropic version header, Gemini path segment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Override of the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Connection settings for the default transport
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    /// Largest response body accepted, in bytes
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
            keepalive_secs: default_keepalive(),
            max_response_size: default_max_response_size(),
        }
    }
}

/// Request logging middleware settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log the native request payload at debug level
    #[serde(default = "default_true")]
    pub log_requests: bool,

    /// Log the normalized response at debug level
    #[serde(default = "default_true")]
    pub log_responses: bool,

    /// Mask credential-like fields in logged payloads
    #[serde(default = "default_true")]
    pub mask_sensitive: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: true,
            mask_sensitive: true,
        }
    }
}

// Default value functions for serde
fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_true() -> bool { true }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 60_000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }
fn default_max_response_size() -> usize { 50 * 1024 * 1024 }

impl UnillmConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: CONFIG_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        for provider in ProviderType::all() {
            if let Some(settings) = self.providers.get(provider) {
                settings.validate(&format!("providers.{}", provider))?;
            }
        }

        self.http.validate("http")
    }
}

impl ProviderSettings {
    /// Validate provider settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if let Some(key) = &self.api_key {
            if key.is_empty() {
                return Err(ValidationError::required(format!("{}.api_key", path))
                    .with_context("Remove the field to fall back to environment credentials"));
            }
        }

        if let Some(version) = &self.api_version {
            if version.trim().is_empty() {
                return Err(ValidationError::invalid_format(
                    format!("{}.api_version", path),
                    "must not be blank",
                ));
            }
        }

        if let Some(base_url) = &self.base_url {
            match url::Url::parse(base_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: format!(
                                "URL scheme must be http or https, got: {}",
                                url.scheme()
                            ),
                        },
                    ));
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }

        Ok(())
    }
}

impl HttpSettings {
    /// Validate connection settings
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_ms < self.connect_timeout_ms {
            return Err(ValidationError::new(
                format!("{}.request_timeout_ms", path),
                ValidationErrorKind::Incompatible {
                    message: "Must be >= connect_timeout_ms".to_string(),
                },
            ));
        }

        if self.max_response_size == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_response_size", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}
