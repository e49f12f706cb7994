//! Credential lookup by provider identity
//!
//! Adapters are built from a [`ProviderConfig`] resolved once at startup. A
//! missing api key is reported as a configuration error before any request
//! is sent.

use super::schema::{ProviderType, UnillmConfig};
use super::secrets::SecretString;
use crate::error::LlmError;
use std::env;

/// Named configuration value requested for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    ApiKey,
    OrganizationId,
    ApiVersion,
    BaseUrl,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::OrganizationId => "organization_id",
            Self::ApiVersion => "api_version",
            Self::BaseUrl => "base_url",
        }
    }
}

/// Source of named configuration values
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, provider: ProviderType, key: CredentialKey) -> Option<SecretString>;
}

impl CredentialSource for UnillmConfig {
    fn lookup(&self, provider: ProviderType, key: CredentialKey) -> Option<SecretString> {
        let settings = self.providers.get(provider)?;
        match key {
            CredentialKey::ApiKey => settings.api_key.clone(),
            CredentialKey::OrganizationId => settings.organization_id.clone().map(SecretString::new),
            CredentialKey::ApiVersion => settings.api_version.clone().map(SecretString::new),
            CredentialKey::BaseUrl => settings.base_url.clone().map(SecretString::new),
        }
    }
}

/// Reads credentials from process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Environment variable holding `key` for `provider`
    pub fn var_name(provider: ProviderType, key: CredentialKey) -> Option<&'static str> {
        match (provider, key) {
            (ProviderType::OpenAI, CredentialKey::ApiKey) => Some("OPENAI_API_KEY"),
            (ProviderType::OpenAI, CredentialKey::OrganizationId) => Some("OPENAI_ORG_ID"),
            (ProviderType::OpenAI, CredentialKey::BaseUrl) => Some("OPENAI_BASE_URL"),
            (ProviderType::Anthropic, CredentialKey::ApiKey) => Some("ANTHROPIC_API_KEY"),
            (ProviderType::Anthropic, CredentialKey::ApiVersion) => Some("ANTHROPIC_VERSION"),
            (ProviderType::Anthropic, CredentialKey::BaseUrl) => Some("ANTHROPIC_BASE_URL"),
            (ProviderType::Gemini, CredentialKey::ApiKey) => Some("GEMINI_API_KEY"),
            (ProviderType::Gemini, CredentialKey::ApiVersion) => Some("GEMINI_API_VERSION"),
            (ProviderType::Gemini, CredentialKey::BaseUrl) => Some("GEMINI_BASE_URL"),
            _ => None,
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn lookup(&self, provider: ProviderType, key: CredentialKey) -> Option<SecretString> {
        let name = Self::var_name(provider, key)?;
        env::var(name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::new)
    }
}

/// Consults each source in order and returns the first value found
pub struct LayeredCredentials {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl LayeredCredentials {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl Default for LayeredCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for LayeredCredentials {
    fn lookup(&self, provider: ProviderType, key: CredentialKey) -> Option<SecretString> {
        self.sources.iter().find_map(|s| s.lookup(provider, key))
    }
}

/// Resolved, read-only settings an adapter is constructed with
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    pub api_key: SecretString,
    pub organization_id: Option<String>,
    pub api_version: Option<String>,
    pub base_url: String,
}

impl ProviderConfig {
    pub fn new(provider: ProviderType, api_key: impl Into<SecretString>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            organization_id: None,
            api_version: None,
            base_url: provider.default_base_url().to_string(),
        }
    }

    /// Look up every value for `provider`; fails when the api key is missing
    pub fn resolve(provider: ProviderType, source: &dyn CredentialSource) -> Result<Self, LlmError> {
        let api_key = source
            .lookup(provider, CredentialKey::ApiKey)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LlmError::configuration(
                    provider.as_str(),
                    format!("missing api_key for provider '{}'", provider),
                )
            })?;

        let value = |key| {
            source
                .lookup(provider, key)
                .map(|v| v.expose_secret().to_string())
        };

        let mut config = Self::new(provider, api_key);
        config.organization_id = value(CredentialKey::OrganizationId);
        config.api_version = value(CredentialKey::ApiVersion);
        if let Some(base_url) = value(CredentialKey::BaseUrl) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
