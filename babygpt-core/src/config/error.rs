//! Configuration errors.
//!
//! All errors produced by the config module (validation and env loading) use [`ConfigError`].

use thiserror::Error;

/// Errors produced when building or validating configuration.
///
/// # Variants
///
/// - **Validation**: Values are inconsistent or out of range (e.g. `model_width` not divisible by `num_heads`).
///   *When*: [`Config::validate`](super::Config::validate).
///   *Recovery*: Fix the values so that `validate()` passes; the message names the rule that failed.
///
/// - **EnvVar**: An environment variable could not be read (e.g. invalid Unicode).
///   *When*: When using env helpers to read a key.
///
/// - **Parse**: An environment variable was set but could not be parsed into the expected type (e.g. `BABYGPT_SEED=abc`).
///   *When*: [`env_parsed`](super::env_parsed) and therefore [`from_env`](super::from_env).
///   *Recovery*: Set a valid value or unset the variable to use the default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration validation failed.
    #[error("config validation: {0}")]
    Validation(String),

    /// Failed to read an environment variable.
    #[error("env var {key}: {message}")]
    EnvVar { key: String, message: String },

    /// Environment variable was set but could not be parsed into the expected type.
    #[error("env var {key}={value:?}: {message}")]
    Parse {
        key: String,
        value: String,
        message: String,
    },
}

impl ConfigError {
    /// Returns a short message suitable for logging or user display.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ConfigError::Validation(m) => m,
            ConfigError::EnvVar { message, .. } | ConfigError::Parse { message, .. } => message,
        }
    }
}
