//! Build [`Config`] from environment variables.
//!
//! Key names live in the `constants` submodule; every key is optional and falls
//! back to [`Config::default`].

use std::path::PathBuf;
use std::str::FromStr;

use super::constants::{
    ENV_BATCH_SIZE, ENV_BETA1, ENV_BETA2, ENV_CHECKPOINT_PATH, ENV_CONTEXT_LENGTH,
    ENV_DROPOUT_RATE, ENV_EPSILON, ENV_EVAL_INTERVAL, ENV_EVAL_SAMPLES, ENV_GENERATE_TOKENS,
    ENV_GRAD_CLIP, ENV_INIT_STD, ENV_INPUT_PATH, ENV_LAYER_NORM_EPS, ENV_LEARNING_RATE,
    ENV_MODEL_WIDTH, ENV_NUM_HEADS, ENV_NUM_LAYERS, ENV_PREFIX, ENV_PROMPT, ENV_SEED,
    ENV_TEMPERATURE, ENV_TOTAL_STEPS, ENV_TRAIN_SPLIT, ENV_WEIGHT_DECAY,
};
use super::Config;
use super::ConfigError;

/// Returns the full environment variable key for a given suffix (e.g. `SEED` → `BABYGPT_SEED`).
#[must_use]
pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Reads an environment variable as a string.
///
/// Returns `Some(value)` if the variable is set and valid UTF-8, `None` if unset.
///
/// # Errors
///
/// [`ConfigError::EnvVar`] if the variable is set but not valid Unicode.
pub fn env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reads an environment variable and parses it into type `T`.
///
/// Returns `Ok(Some(value))` if set and parse succeeds, `Ok(None)` if unset.
///
/// # Errors
///
/// [`ConfigError::Parse`] if set but parsing fails (e.g. `SEED=abc` for `u64`),
/// [`ConfigError::EnvVar`] if the value is not valid Unicode.
pub fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(s) = env_string(key)? else {
        return Ok(None);
    };
    match s.trim().parse() {
        Ok(t) => Ok(Some(t)),
        Err(e) => Err(ConfigError::Parse {
            key: key.to_string(),
            value: s,
            message: e.to_string(),
        }),
    }
}

/// `BABYGPT_{suffix}` parsed as `T`, or `default` when unset.
fn parsed_or<T>(suffix: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_parsed(&env_key(suffix))?.unwrap_or(default))
}

/// Builds [`Config`] from environment variables, falling back to [`Config::default`] for unset values.
///
/// The result is not validated; call [`Config::validate`] before use.
///
/// # Errors
///
/// Returns [`ConfigError`] if any *set* variable fails to read or parse (e.g. `BABYGPT_SEED=abc`).
pub fn from_env() -> Result<Config, ConfigError> {
    let d = Config::default();

    let input_path = env_string(&env_key(ENV_INPUT_PATH))?
        .map(PathBuf::from)
        .unwrap_or(d.input_path);
    let checkpoint_path = env_string(&env_key(ENV_CHECKPOINT_PATH))?
        .map(PathBuf::from)
        .unwrap_or(d.checkpoint_path);
    let prompt = env_string(&env_key(ENV_PROMPT))?.unwrap_or(d.prompt);

    Ok(Config {
        seed: parsed_or(ENV_SEED, d.seed)?,
        input_path,
        checkpoint_path,
        batch_size: parsed_or(ENV_BATCH_SIZE, d.batch_size)?,
        context_length: parsed_or(ENV_CONTEXT_LENGTH, d.context_length)?,
        model_width: parsed_or(ENV_MODEL_WIDTH, d.model_width)?,
        num_heads: parsed_or(ENV_NUM_HEADS, d.num_heads)?,
        num_layers: parsed_or(ENV_NUM_LAYERS, d.num_layers)?,
        dropout_rate: parsed_or(ENV_DROPOUT_RATE, d.dropout_rate)?,
        init_std: parsed_or(ENV_INIT_STD, d.init_std)?,
        layer_norm_eps: parsed_or(ENV_LAYER_NORM_EPS, d.layer_norm_eps)?,
        learning_rate: parsed_or(ENV_LEARNING_RATE, d.learning_rate)?,
        beta1: parsed_or(ENV_BETA1, d.beta1)?,
        beta2: parsed_or(ENV_BETA2, d.beta2)?,
        epsilon: parsed_or(ENV_EPSILON, d.epsilon)?,
        weight_decay: parsed_or(ENV_WEIGHT_DECAY, d.weight_decay)?,
        grad_clip: parsed_or(ENV_GRAD_CLIP, d.grad_clip)?,
        total_steps: parsed_or(ENV_TOTAL_STEPS, d.total_steps)?,
        eval_interval: parsed_or(ENV_EVAL_INTERVAL, d.eval_interval)?,
        eval_samples: parsed_or(ENV_EVAL_SAMPLES, d.eval_samples)?,
        train_split: parsed_or(ENV_TRAIN_SPLIT, d.train_split)?,
        temperature: parsed_or(ENV_TEMPERATURE, d.temperature)?,
        generate_tokens: parsed_or(ENV_GENERATE_TOKENS, d.generate_tokens)?,
        prompt,
    })
}
