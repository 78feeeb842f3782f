//! Shared configuration primitives for the reservation workspace.
//!
//! Every crate that reads its settings from the process environment implements
//! [`FromEnv`] and uses the helpers below so that missing and malformed variables
//! produce the same [`ConfigError`] everywhere.

pub mod tracing;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment (dev = local, prod = deployed)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable or return [`ConfigError::MissingEnvVar`]
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Load and parse an environment variable, falling back to `default` when unset.
///
/// A value that is present but does not parse is an error, never silently replaced
/// by the default.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Load a comma-separated list, e.g. `RESERVATION_REMINDER_DAYS=3,1`.
///
/// Empty segments are skipped.
pub fn env_list<T>(key: &str, default: Vec<T>) -> Result<Vec<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        return Ok(default);
    };

    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.parse().map_err(|e: T::Err| ConfigError::ParseError {
                key: key.to_string(),
                details: format!("'{}': {}", segment, e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });

        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("RESERVATION_TEST_VAR", Some("value"), || {
            assert_eq!(env_or_default("RESERVATION_TEST_VAR", "default"), "value");
        });

        temp_env::with_var_unset("RESERVATION_TEST_VAR", || {
            assert_eq!(env_or_default("RESERVATION_TEST_VAR", "default"), "default");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("MISSING_REQUIRED", || {
            let err = env_required("MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_default_and_value() {
        temp_env::with_var_unset("NOTIFY_TIMEOUT", || {
            assert_eq!(env_parse("NOTIFY_TIMEOUT", 5000u64).unwrap(), 5000);
        });

        temp_env::with_var("NOTIFY_TIMEOUT", Some(" 250 "), || {
            assert_eq!(env_parse("NOTIFY_TIMEOUT", 5000u64).unwrap(), 250);
        });
    }

    #[test]
    fn test_env_parse_invalid_is_error() {
        temp_env::with_var("NOTIFY_TIMEOUT", Some("soon"), || {
            let err = env_parse("NOTIFY_TIMEOUT", 5000u64).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "NOTIFY_TIMEOUT"));
        });
    }

    #[test]
    fn test_env_list() {
        temp_env::with_var("REMINDER_DAYS", Some("3, 1,,7"), || {
            assert_eq!(env_list::<i64>("REMINDER_DAYS", vec![]).unwrap(), vec![3, 1, 7]);
        });

        temp_env::with_var_unset("REMINDER_DAYS", || {
            assert_eq!(env_list("REMINDER_DAYS", vec![3i64, 1]).unwrap(), vec![3, 1]);
        });

        temp_env::with_var("REMINDER_DAYS", Some("3,x"), || {
            assert!(env_list::<i64>("REMINDER_DAYS", vec![]).is_err());
        });
    }
}
