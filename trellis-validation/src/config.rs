// Validation option loading

use serde::Deserialize;
use thiserror::Error;
use trellis_schema::{Presence, ValidationOptions};

/// Prefix of the environment variables read by [`from_env`].
pub const ENV_PREFIX: &str = "TRELLIS_VALIDATION";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Load validation options from `TRELLIS_VALIDATION_*` environment variables.
///
/// | Variable | Option |
/// |---|---|
/// | `TRELLIS_VALIDATION_ABORT_EARLY` | `abort_early` |
/// | `TRELLIS_VALIDATION_CONVERT` | `convert` |
/// | `TRELLIS_VALIDATION_ALLOW_UNKNOWN` | `allow_unknown` |
/// | `TRELLIS_VALIDATION_STRIP_UNKNOWN` | `strip_unknown` |
/// | `TRELLIS_VALIDATION_PRESENCE` | `presence` (`optional`, `required`, `forbidden`) |
/// | `TRELLIS_VALIDATION_NO_DEFAULTS` | `no_defaults` |
/// | `TRELLIS_VALIDATION_NULL_AS_ABSENT` | `null_as_absent` |
///
/// Unset variables keep their defaults.
pub fn from_env() -> Result<ValidationOptions, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Like [`from_env`], reading variables through `lookup`.
pub fn from_lookup<F>(lookup: F) -> Result<ValidationOptions, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        let key = format!("{}_{}", ENV_PREFIX, name);
        lookup(&key).map(|value| (key, value))
    };
    let flag = |name: &str, current: bool| match var(name) {
        Some((key, value)) => parse_bool(&key, &value),
        None => Ok(current),
    };

    let defaults = ValidationOptions::default();
    let presence = match var("PRESENCE") {
        Some((key, value)) => parse_presence(&key, &value)?,
        None => defaults.presence,
    };

    Ok(ValidationOptions {
        abort_early: flag("ABORT_EARLY", defaults.abort_early)?,
        convert: flag("CONVERT", defaults.convert)?,
        allow_unknown: flag("ALLOW_UNKNOWN", defaults.allow_unknown)?,
        strip_unknown: flag("STRIP_UNKNOWN", defaults.strip_unknown)?,
        presence,
        no_defaults: flag("NO_DEFAULTS", defaults.no_defaults)?,
        null_as_absent: flag("NULL_AS_ABSENT", defaults.null_as_absent)?,
    })
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    validation: ValidationOptions,
}

/// Parse the `[validation]` table of a TOML document.
///
/// ```
/// let options = trellis_validation::config::from_toml_str(
///     "[validation]\nabort_early = true\npresence = \"required\"\n",
/// ).unwrap();
/// assert!(options.abort_early);
/// ```
pub fn from_toml_str(content: &str) -> Result<ValidationOptions, ConfigError> {
    let file: ConfigFile = toml::from_str(content)?;
    Ok(file.validation)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_presence(key: &str, value: &str) -> Result<Presence, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "optional" => Ok(Presence::Optional),
        "required" => Ok(Presence::Required),
        "forbidden" => Ok(Presence::Forbidden),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "optional, required or forbidden",
        }),
    }
}
