//! Configuration validation beyond the schema rules

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::{ProviderType, UnillmConfig};
use regex::Regex;
use tracing::warn;

/// Configuration validator with additional rules
pub struct ConfigValidator {
    /// Unresolved `${VAR}` placeholders
    env_var_pattern: Regex,
    /// Anthropic version strings are dates
    anthropic_version_pattern: Regex,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            env_var_pattern: Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid regex"),
            anthropic_version_pattern: Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"),
        }
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &UnillmConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_placeholders(config)?;
        self.validate_api_versions(config)?;
        self.warn_on_plain_http(config);

        Ok(())
    }

    fn validate_placeholders(&self, config: &UnillmConfig) -> Result<(), ValidationError> {
        for provider in ProviderType::all() {
            let Some(settings) = config.providers.get(provider) else {
                continue;
            };
            if let Some(key) = &settings.api_key {
                if self.env_var_pattern.is_match(key.expose_secret()) {
                    return Err(ValidationError::invalid_format(
                        format!("providers.{}.api_key", provider),
                        "unresolved environment variable placeholder",
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_api_versions(&self, config: &UnillmConfig) -> Result<(), ValidationError> {
        if let Some(version) = config
            .providers
            .anthropic
            .as_ref()
            .and_then(|s| s.api_version.as_deref())
        {
            if !self.anthropic_version_pattern.is_match(version) {
                return Err(ValidationError::new(
                    "providers.anthropic.api_version",
                    ValidationErrorKind::InvalidFormat {
                        message: format!("expected YYYY-MM-DD, got {}", version),
                    },
                ));
            }
        }

        if let Some(version) = config
            .providers
            .gemini
            .as_ref()
            .and_then(|s| s.api_version.as_deref())
        {
            if !version.starts_with('v') {
                return Err(ValidationError::invalid_format(
                    "providers.gemini.api_version",
                    format!("expected a version like v1beta, got {}", version),
                ));
            }
        }

        Ok(())
    }

    fn warn_on_plain_http(&self, config: &UnillmConfig) {
        for provider in ProviderType::all() {
            let base_url = config
                .providers
                .get(provider)
                .and_then(|s| s.base_url.as_deref());
            if let Some(url) = base_url.filter(|u| u.starts_with("http://")) {
                warn!(provider = %provider, base_url = url, "provider base_url does not use TLS");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderSettings, SecretString};

    #[test]
    fn test_rejects_bad_anthropic_version() {
        let mut config = UnillmConfig::default();
        config.providers.anthropic = Some(ProviderSettings {
            api_version: Some("latest".into()),
            ..Default::default()
        });

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "providers.anthropic.api_version");
    }

    #[test]
    fn test_rejects_unresolved_placeholder() {
        let mut config = UnillmConfig::default();
        config.providers.openai = Some(ProviderSettings {
            api_key: Some(SecretString::new("${OPENAI_API_KEY}")),
            ..Default::default()
        });

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "providers.openai.api_key");
    }
}
