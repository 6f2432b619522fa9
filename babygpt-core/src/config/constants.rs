//! Default values and environment variable key names used by the config builder.

/// Environment variable prefix (e.g. `BABYGPT_MODEL_WIDTH`).
pub(crate) const ENV_PREFIX: &str = "BABYGPT_";

// --- Env key suffixes (full key = ENV_PREFIX + suffix) ---

pub(crate) const ENV_SEED: &str = "SEED";
pub(crate) const ENV_INPUT_PATH: &str = "INPUT_PATH";
pub(crate) const ENV_CHECKPOINT_PATH: &str = "CHECKPOINT_PATH";
pub(crate) const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub(crate) const ENV_CONTEXT_LENGTH: &str = "CONTEXT_LENGTH";
pub(crate) const ENV_MODEL_WIDTH: &str = "MODEL_WIDTH";
pub(crate) const ENV_NUM_HEADS: &str = "NUM_HEADS";
pub(crate) const ENV_NUM_LAYERS: &str = "NUM_LAYERS";
pub(crate) const ENV_DROPOUT_RATE: &str = "DROPOUT_RATE";
pub(crate) const ENV_INIT_STD: &str = "INIT_STD";
pub(crate) const ENV_LAYER_NORM_EPS: &str = "LAYER_NORM_EPS";
pub(crate) const ENV_LEARNING_RATE: &str = "LEARNING_RATE";
pub(crate) const ENV_BETA1: &str = "BETA1";
pub(crate) const ENV_BETA2: &str = "BETA2";
pub(crate) const ENV_EPSILON: &str = "EPSILON";
pub(crate) const ENV_WEIGHT_DECAY: &str = "WEIGHT_DECAY";
pub(crate) const ENV_GRAD_CLIP: &str = "GRAD_CLIP";
pub(crate) const ENV_TOTAL_STEPS: &str = "TOTAL_STEPS";
pub(crate) const ENV_EVAL_INTERVAL: &str = "EVAL_INTERVAL";
pub(crate) const ENV_EVAL_SAMPLES: &str = "EVAL_SAMPLES";
pub(crate) const ENV_TRAIN_SPLIT: &str = "TRAIN_SPLIT";
pub(crate) const ENV_TEMPERATURE: &str = "TEMPERATURE";
pub(crate) const ENV_GENERATE_TOKENS: &str = "GENERATE_TOKENS";
pub(crate) const ENV_PROMPT: &str = "PROMPT";

// --- Default values ---

pub(crate) const DEFAULT_SEED: u64 = 1337;
pub(crate) const DEFAULT_INPUT_PATH: &str = "input.txt";
pub(crate) const DEFAULT_CHECKPOINT_PATH: &str = "model_params.json";
pub(crate) const DEFAULT_BATCH_SIZE: usize = 16;
pub(crate) const DEFAULT_CONTEXT_LENGTH: usize = 32;
pub(crate) const DEFAULT_MODEL_WIDTH: usize = 32;
pub(crate) const DEFAULT_NUM_HEADS: usize = 4;
pub(crate) const DEFAULT_NUM_LAYERS: usize = 2;
pub(crate) const DEFAULT_DROPOUT_RATE: f64 = 0.1;
pub(crate) const DEFAULT_INIT_STD: f64 = 0.08;
pub(crate) const DEFAULT_LAYER_NORM_EPS: f64 = 1e-5;
pub(crate) const DEFAULT_LEARNING_RATE: f64 = 3e-3;
pub(crate) const DEFAULT_BETA1: f64 = 0.9;
pub(crate) const DEFAULT_BETA2: f64 = 0.999;
pub(crate) const DEFAULT_EPSILON: f64 = 1e-8;
pub(crate) const DEFAULT_WEIGHT_DECAY: f64 = 0.01;
pub(crate) const DEFAULT_GRAD_CLIP: f64 = 1.0;
pub(crate) const DEFAULT_TOTAL_STEPS: usize = 2000;
pub(crate) const DEFAULT_EVAL_INTERVAL: usize = 200;
pub(crate) const DEFAULT_EVAL_SAMPLES: usize = 20;
pub(crate) const DEFAULT_TRAIN_SPLIT: f64 = 0.9;
pub(crate) const DEFAULT_TEMPERATURE: f64 = 1.0;
pub(crate) const DEFAULT_GENERATE_TOKENS: usize = 500;
pub(crate) const DEFAULT_PROMPT: &str = "";
