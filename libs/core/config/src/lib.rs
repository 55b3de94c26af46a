pub mod cluster;
pub mod pricing;
pub mod probe;
pub mod provisioner;
pub mod tracing;

use std::env;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(String),

    #[error("Environment variable '{key}' has unusable value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Deployment environment, detected from APP_ENV.
///
/// Anything other than "production" (case-insensitive) counts as
/// development; local runs and kind clusters should not need to set the
/// variable at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn detect() -> Self {
        match env::var("APP_ENV") {
            Ok(value) if value.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Config sections that assemble themselves from environment variables.
/// The binary composes these into its top-level `Config`; the domain
/// crates only ever see the resolved values.
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Required variable; absence is a startup error
pub fn require_var(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Optional variable with a fallback
pub fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Optional variable parsed into `T`. A variable that is present but
/// unparseable is an error, not a silent fallback to the default; the
/// offending value is carried in the error for the startup log.
pub fn parse_var_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
        },
    }
}
