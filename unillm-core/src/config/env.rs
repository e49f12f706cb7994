//! Environment variable interpolation for configuration files

use super::error::ConfigError;
use super::schema::UnillmConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Replace every `${VAR}` reference in `content` with its environment value
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        match env::var(&cap[1]) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(result.into_owned()),
    }
}

/// Interpolate credential fields that still hold placeholders after parsing
pub fn interpolate_config_env_vars(config: &mut UnillmConfig) -> Result<(), ConfigError> {
    for settings in config.providers.iter_mut() {
        if let Some(key) = &settings.api_key {
            if ENV_VAR_PATTERN.is_match(key.expose_secret()) {
                let value = interpolate_env_vars(key.expose_secret())?;
                settings.api_key = Some(SecretString::new(value));
            }
        }

        if let Some(base_url) = &settings.base_url {
            if ENV_VAR_PATTERN.is_match(base_url) {
                settings.base_url = Some(interpolate_env_vars(base_url)?);
            }
        }
    }

    Ok(())
}
