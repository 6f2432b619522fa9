//! Configuration for the model, training, generation and paths.
//!
//! Load from environment via [`from_env`] and validate with [`Config::validate`].
//! Default values and env key names are centralized in the `constants` submodule.

mod builder;
mod constants;
mod error;

use std::path::PathBuf;

use constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_CHECKPOINT_PATH,
    DEFAULT_CONTEXT_LENGTH, DEFAULT_DROPOUT_RATE, DEFAULT_EPSILON, DEFAULT_EVAL_INTERVAL,
    DEFAULT_EVAL_SAMPLES, DEFAULT_GENERATE_TOKENS, DEFAULT_GRAD_CLIP, DEFAULT_INIT_STD,
    DEFAULT_INPUT_PATH, DEFAULT_LAYER_NORM_EPS, DEFAULT_LEARNING_RATE, DEFAULT_MODEL_WIDTH,
    DEFAULT_NUM_HEADS, DEFAULT_NUM_LAYERS, DEFAULT_PROMPT, DEFAULT_SEED, DEFAULT_TEMPERATURE,
    DEFAULT_TOTAL_STEPS, DEFAULT_TRAIN_SPLIT, DEFAULT_WEIGHT_DECAY,
};

pub use builder::{env_key, env_parsed, env_string, from_env};
pub use error::ConfigError;

/// Central, immutable configuration shared by the model, trainer and binary.
///
/// Use [`from_env`] to build from environment variables and [`Config::validate`] before use.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Seed for the injected RNG (init, batches, dropout, sampling).
    pub seed: u64,
    /// Path to the UTF-8 training corpus.
    pub input_path: PathBuf,
    /// Where the trained model is written.
    pub checkpoint_path: PathBuf,

    /// Sequences per training batch.
    pub batch_size: usize,
    /// Maximum number of positions the model attends over.
    pub context_length: usize,
    /// Embedding width (must be divisible by `num_heads`).
    pub model_width: usize,
    pub num_heads: usize,
    /// Number of transformer blocks; 0 gives an embeddings-only model.
    pub num_layers: usize,
    /// Dropout probability applied in training mode, in `[0, 1)`.
    pub dropout_rate: f64,

    /// Standard deviation of the normal weight init.
    pub init_std: f64,
    pub layer_norm_eps: f64,

    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    /// Decoupled (AdamW) weight decay.
    pub weight_decay: f64,
    /// Max global gradient norm; 0 disables clipping.
    pub grad_clip: f64,

    pub total_steps: usize,
    /// Evaluate train/validation loss every this many steps.
    pub eval_interval: usize,
    /// Batches averaged per split in each evaluation.
    pub eval_samples: usize,
    /// Fraction of tokens used for training, in `(0, 1]`. The rest validates.
    pub train_split: f64,

    /// Sampling temperature (> 0; 1.0 samples the plain softmax).
    pub temperature: f64,
    /// Tokens generated by the binary after training.
    pub generate_tokens: usize,
    /// Text generation starts from (empty starts from token id 0).
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            context_length: DEFAULT_CONTEXT_LENGTH,
            model_width: DEFAULT_MODEL_WIDTH,
            num_heads: DEFAULT_NUM_HEADS,
            num_layers: DEFAULT_NUM_LAYERS,
            dropout_rate: DEFAULT_DROPOUT_RATE,
            init_std: DEFAULT_INIT_STD,
            layer_norm_eps: DEFAULT_LAYER_NORM_EPS,
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            grad_clip: DEFAULT_GRAD_CLIP,
            total_steps: DEFAULT_TOTAL_STEPS,
            eval_interval: DEFAULT_EVAL_INTERVAL,
            eval_samples: DEFAULT_EVAL_SAMPLES,
            train_split: DEFAULT_TRAIN_SPLIT,
            temperature: DEFAULT_TEMPERATURE,
            generate_tokens: DEFAULT_GENERATE_TOKENS,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(message.into()))
}

impl Config {
    /// Validates configuration. Returns `Ok(())` if valid.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] naming the first rule that failed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_heads == 0 {
            return invalid("num_heads must be greater than 0");
        }
        if self.model_width == 0 {
            return invalid("model_width must be greater than 0");
        }
        if !self.model_width.is_multiple_of(self.num_heads) {
            return invalid(format!(
                "model_width ({}) must be divisible by num_heads ({})",
                self.model_width, self.num_heads
            ));
        }
        if self.context_length == 0 {
            return invalid("context_length must be greater than 0");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be greater than 0");
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return invalid(format!(
                "dropout_rate ({}) must be in [0, 1)",
                self.dropout_rate
            ));
        }
        if self.train_split.is_nan() || self.train_split <= 0.0 || self.train_split > 1.0 {
            return invalid(format!(
                "train_split ({}) must be in (0, 1]",
                self.train_split
            ));
        }
        if self.eval_interval == 0 {
            return invalid("eval_interval must be greater than 0");
        }
        if self.eval_samples == 0 {
            return invalid("eval_samples must be greater than 0");
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return invalid("learning_rate must be positive");
        }
        if self.temperature.is_nan() || self.temperature <= 0.0 {
            return invalid("temperature must be positive");
        }
        if self.layer_norm_eps.is_nan() || self.layer_norm_eps <= 0.0 {
            return invalid("layer_norm_eps must be positive");
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return invalid(format!("{name} ({beta}) must be in [0, 1)"));
            }
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return invalid("epsilon must be positive");
        }
        if self.weight_decay.is_nan() || self.weight_decay < 0.0 {
            return invalid("weight_decay must not be negative");
        }
        // zero disables clipping
        if self.grad_clip.is_nan() || self.grad_clip < 0.0 {
            return invalid("grad_clip must not be negative");
        }
        Ok(())
    }

    /// Width of one attention head (`model_width / num_heads`).
    #[must_use]
    pub fn head_width(&self) -> usize {
        self.model_width / self.num_heads
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{ENV_MODEL_WIDTH, ENV_NUM_HEADS, ENV_PROMPT, ENV_SEED};
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.head_width(), 8);
    }

    #[test]
    fn validate_rejects_width_not_divisible_by_heads() {
        let cfg = Config {
            model_width: 30,
            num_heads: 4,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.message().contains("divisible"));
    }

    #[test]
    fn validate_accepts_zero_layers() {
        let cfg = Config {
            num_layers: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        for cfg in [
            Config {
                num_heads: 0,
                ..Config::default()
            },
            Config {
                model_width: 0,
                ..Config::default()
            },
            Config {
                context_length: 0,
                ..Config::default()
            },
            Config {
                batch_size: 0,
                ..Config::default()
            },
            Config {
                eval_interval: 0,
                ..Config::default()
            },
            Config {
                eval_samples: 0,
                ..Config::default()
            },
        ] {
            assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
        }
    }

    #[test]
    fn validate_rejects_rates_out_of_range() {
        let bad = [
            Config {
                dropout_rate: 1.0,
                ..Config::default()
            },
            Config {
                dropout_rate: -0.1,
                ..Config::default()
            },
            Config {
                train_split: 0.0,
                ..Config::default()
            },
            Config {
                train_split: 1.5,
                ..Config::default()
            },
            Config {
                learning_rate: 0.0,
                ..Config::default()
            },
            Config {
                temperature: 0.0,
                ..Config::default()
            },
            Config {
                temperature: f64::NAN,
                ..Config::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_numerically_unsafe_optimizer_and_norm_settings() {
        let bad = [
            Config {
                layer_norm_eps: -1.0,
                ..Config::default()
            },
            Config {
                layer_norm_eps: 0.0,
                ..Config::default()
            },
            Config {
                beta1: 1.0,
                ..Config::default()
            },
            Config {
                beta2: -0.5,
                ..Config::default()
            },
            Config {
                beta2: f64::NAN,
                ..Config::default()
            },
            Config {
                epsilon: 0.0,
                ..Config::default()
            },
            Config {
                weight_decay: -0.01,
                ..Config::default()
            },
            Config {
                grad_clip: -1.0,
                ..Config::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Validation(_))),
                "{cfg:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_accepts_disabled_clipping_and_decay() {
        let cfg = Config {
            grad_clip: 0.0,
            weight_decay: 0.0,
            beta1: 0.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_accepts_full_train_split_and_hot_temperature() {
        let cfg = Config {
            train_split: 1.0,
            temperature: 2.0,
            dropout_rate: 0.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    /// Lock so env tests don't run in parallel and pollute each other.
    static CONFIG_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn from_env_falls_back_to_defaults() {
        let _g = CONFIG_ENV_LOCK.lock().unwrap();
        std::env::remove_var(env_key(ENV_MODEL_WIDTH));
        std::env::remove_var(env_key(ENV_SEED));
        std::env::remove_var(env_key(ENV_PROMPT));
        let cfg = from_env().unwrap();
        assert_eq!(cfg.model_width, 32);
        assert_eq!(cfg.seed, 1337);
        assert_eq!(cfg.prompt, "");
    }

    #[test]
    fn from_env_overrides_with_env_vars() {
        let _g = CONFIG_ENV_LOCK.lock().unwrap();
        let key_width = env_key(ENV_MODEL_WIDTH);
        let key_heads = env_key(ENV_NUM_HEADS);
        let key_prompt = env_key(ENV_PROMPT);
        std::env::set_var(&key_width, "64");
        std::env::set_var(&key_heads, "8");
        std::env::set_var(&key_prompt, "ROMEO:");
        let cfg = from_env();
        std::env::remove_var(key_width);
        std::env::remove_var(key_heads);
        std::env::remove_var(key_prompt);
        let cfg = cfg.unwrap();
        assert_eq!(cfg.model_width, 64);
        assert_eq!(cfg.num_heads, 8);
        assert_eq!(cfg.head_width(), 8);
        assert_eq!(cfg.prompt, "ROMEO:");
    }

    #[test]
    fn from_env_returns_error_on_invalid_parse() {
        let _g = CONFIG_ENV_LOCK.lock().unwrap();
        let key = env_key(ENV_SEED);
        std::env::set_var(&key, "not_a_number");
        let res = from_env();
        std::env::remove_var(key);
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_key_uses_prefix() {
        assert_eq!(env_key("SEED"), "BABYGPT_SEED");
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::Validation("num_heads must be greater than 0".to_string());
        assert_eq!(
            e.to_string(),
            "config validation: num_heads must be greater than 0"
        );
        let e = ConfigError::Parse {
            key: "BABYGPT_SEED".to_string(),
            value: "abc".to_string(),
            message: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "env var BABYGPT_SEED=\"abc\": invalid digit found in string"
        );
        assert_eq!(e.message(), "invalid digit found in string");
    }

    #[test]
    fn env_parsed_unset_returns_none() {
        assert_eq!(env_string("BABYGPT_UNLIKELY_KEY_12345").unwrap(), None);
        assert_eq!(env_parsed::<u64>("BABYGPT_UNLIKELY_KEY_67890").unwrap(), None);
    }

    #[test]
    fn env_parsed_trims_whitespace() {
        let _g = CONFIG_ENV_LOCK.lock().unwrap();
        let key = "BABYGPT_TEST_TRIMMED_VALUE";
        std::env::set_var(key, " 12 ");
        let res = env_parsed::<usize>(key);
        std::env::remove_var(key);
        assert_eq!(res.unwrap(), Some(12));
    }
}
