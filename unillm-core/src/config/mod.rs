//! Configuration and credentials
//!
//! Configuration files (YAML or JSON) are interpolated with `${ENV_VAR}`
//! references, parsed, and validated. Adapters never read configuration
//! directly; they are built from a [`ProviderConfig`] resolved through a
//! [`CredentialSource`].

mod credentials;
mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use credentials::{
    CredentialKey, CredentialSource, EnvCredentials, LayeredCredentials, ProviderConfig,
};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    HttpSettings, LoggingSettings, ProviderSettings, ProviderType, ProvidersConfig, UnillmConfig,
    CONFIG_VERSION,
};
pub use secrets::{
    get_redaction_policy, is_sensitive_field, mask_sensitive_fields, redact_by_field_name,
    set_redaction_policy, RedactionPolicy, SecretString, MASK,
};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<UnillmConfig> {
    let path = path.as_ref();
    let content = read(path)?;
    from_yaml_str(&content, &path.to_string_lossy())
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<UnillmConfig> {
    let path = path.as_ref();
    let content = read(path)?;
    from_json_str(&content, &path.to_string_lossy())
}

/// Parse YAML configuration text; `origin` names the source in errors
pub fn from_yaml_str(content: &str, origin: &str) -> ConfigResult<UnillmConfig> {
    let interpolated = env::interpolate_env_vars(content)?;

    let config: UnillmConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Parse JSON configuration text; `origin` names the source in errors
pub fn from_json_str(content: &str, origin: &str) -> ConfigResult<UnillmConfig> {
    let interpolated = env::interpolate_env_vars(content)?;

    let config: UnillmConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: UnillmConfig) -> ConfigResult<UnillmConfig> {
    env::interpolate_config_env_vars(&mut config)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
version: "0.1"
providers:
  anthropic:
    api_key: sk-ant-test
    api_version: "2023-06-01"
logging:
  log_requests: false
"#;
        let config = from_yaml_str(yaml, "inline").unwrap();
        let anthropic = config.providers.anthropic.as_ref().unwrap();
        assert_eq!(anthropic.api_key.as_ref().unwrap().expose_secret(), "sk-ant-test");
        assert!(!config.logging.log_requests);
        assert!(config.logging.mask_sensitive);
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = from_json_str(r#"{"version": "0.1", "routing": {}}"#, "inline").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
