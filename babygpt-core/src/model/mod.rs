//! Character-level decoder-only transformer: embeddings, a stack of blocks,
//! final layer norm and the output projection; loss and autoregressive sampling.

mod error;
mod generate;

pub use error::ModelError;
pub use generate::{generate_text, START_TOKEN};

use std::rc::Rc;

use log::debug;
use rand::rngs::StdRng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::{Distribution, Normal};

use crate::autograd::{softmax, Tensor};
use crate::config::{Config, ConfigError};
use crate::data::Batch;
use crate::nn::{join, CausalMask, Embedding, LayerNorm, Linear, Mode, Module, TransformerBlock};

/// The language model. Owns every parameter; the optimizer mutates them through
/// the shared [`Tensor`] handles returned by [`named_parameters`](Self::named_parameters).
///
/// Neither the model nor its layers implement `Clone`: a copy would alias the same
/// parameter handles. Use [`crate::checkpoint`] to get an independent copy.
#[derive(Debug)]
pub struct LanguageModel {
    config: Config,
    vocab_size: usize,
    token_embedding: Embedding,
    position_embedding: Embedding,
    blocks: Vec<TransformerBlock>,
    ln_final: LayerNorm,
    lm_head: Linear,
}

impl LanguageModel {
    /// Builds a freshly initialized model: normal(0, `init_std`) weights, zero biases,
    /// unit layer-norm gains.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidConfig`] when `config` fails validation, `init_std` is not a valid
    /// standard deviation, or `vocab_size` is zero.
    pub fn new(config: &Config, vocab_size: usize, rng: &mut StdRng) -> Result<Self, ModelError> {
        config.validate()?;
        if vocab_size == 0 {
            return Err(ConfigError::Validation("vocab_size must be greater than 0".into()).into());
        }
        let init = Normal::new(0.0, config.init_std)
            .map_err(|e| ConfigError::Validation(format!("init_std ({}): {e}", config.init_std)))?;
        let width = config.model_width;
        let mask = Rc::new(CausalMask::new(config.context_length));

        let token_embedding = Embedding::new(vocab_size, width, &init, rng);
        let position_embedding = Embedding::new(config.context_length, width, &init, rng);
        let blocks = (0..config.num_layers)
            .map(|_| TransformerBlock::new(config, &mask, &init, rng))
            .collect();
        let lm_head = Linear::new(width, vocab_size, true, &init, rng);

        let model = LanguageModel {
            config: config.clone(),
            vocab_size,
            token_embedding,
            position_embedding,
            blocks,
            ln_final: LayerNorm::new(width, config.layer_norm_eps),
            lm_head,
        };
        debug!(
            "built model: vocab {vocab_size}, width {width}, {} blocks, {} parameters",
            config.num_layers,
            model.num_parameters()
        );
        Ok(model)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    #[must_use]
    pub fn context_length(&self) -> usize {
        self.config.context_length
    }

    #[must_use]
    pub fn blocks(&self) -> &[TransformerBlock] {
        &self.blocks
    }

    /// Every parameter as `(name, tensor)` in a stable order, starting with
    /// `token_embedding.weight` and ending with `lm_head.bias`.
    #[must_use]
    pub fn named_parameters(&self) -> Vec<(String, Tensor)> {
        Module::named_parameters(self, "")
    }

    /// Runs the model on `batch_size` stacked sequences of equal length.
    ///
    /// `ids` is row-major `batch_size × t` with `1 <= t <= context_length`. Returns
    /// `(batch_size · t) × vocab_size` logits and, when `targets` is given, the mean
    /// cross-entropy loss as a `1 × 1` tensor.
    ///
    /// # Errors
    ///
    /// - [`ModelError::EmptyInput`] for empty `ids` or a zero `batch_size`.
    /// - [`ModelError::ShapeMismatch`] when `ids` does not split into `batch_size` rows or
    ///   `targets` has a different length.
    /// - [`ModelError::SequenceTooLong`] when `t > context_length`.
    /// - [`ModelError::TokenOutOfRange`] for an input or target id `>= vocab_size`.
    pub fn forward(
        &self,
        ids: &[usize],
        batch_size: usize,
        targets: Option<&[usize]>,
        mode: Mode,
        rng: &mut StdRng,
    ) -> Result<(Tensor, Option<Tensor>), ModelError> {
        if ids.is_empty() || batch_size == 0 {
            return Err(ModelError::EmptyInput);
        }
        if !ids.len().is_multiple_of(batch_size) {
            return Err(ModelError::ShapeMismatch(format!(
                "{} ids do not split into {batch_size} sequences",
                ids.len()
            )));
        }
        let time = ids.len() / batch_size;
        if time > self.context_length() {
            return Err(ModelError::SequenceTooLong {
                len: time,
                max: self.context_length(),
            });
        }
        self.check_ids(ids)?;
        if let Some(targets) = targets {
            self.check_targets(ids, targets)?;
        }

        let positions: Vec<usize> = (0..batch_size).flat_map(|_| 0..time).collect();
        let mut x = &self.token_embedding.forward(ids) + &self.position_embedding.forward(&positions);
        for block in &self.blocks {
            x = block.forward(&x, batch_size, mode, rng);
        }
        let logits = self.lm_head.forward(&self.ln_final.forward(&x));
        let loss = targets.map(|t| logits.cross_entropy(t));
        Ok((logits, loss))
    }

    /// Mean cross-entropy of the model on `batch`.
    ///
    /// # Errors
    ///
    /// Same as [`forward`](Self::forward).
    pub fn loss(&self, batch: &Batch, mode: Mode, rng: &mut StdRng) -> Result<Tensor, ModelError> {
        self.check_targets(&batch.inputs, &batch.targets)?;
        let (logits, _) = self.forward(&batch.inputs, batch.batch_size, None, mode, rng)?;
        Ok(logits.cross_entropy(&batch.targets))
    }

    fn check_targets(&self, ids: &[usize], targets: &[usize]) -> Result<(), ModelError> {
        if targets.len() != ids.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "{} targets for {} ids",
                targets.len(),
                ids.len()
            )));
        }
        self.check_ids(targets)
    }

    fn check_ids(&self, ids: &[usize]) -> Result<(), ModelError> {
        match ids.iter().find(|&&id| id >= self.vocab_size) {
            Some(&id) => Err(ModelError::TokenOutOfRange {
                id,
                vocab_size: self.vocab_size,
            }),
            None => Ok(()),
        }
    }

    /// Extends `seed` by `k` sampled ids and returns the whole sequence (`seed.len() + k` ids).
    ///
    /// Each step feeds the last `context_length` ids in inference mode, divides the
    /// final position's logits by `temperature` and samples from their softmax.
    ///
    /// # Errors
    ///
    /// - [`ModelError::EmptyInput`] for an empty `seed`.
    /// - [`ModelError::InvalidTemperature`] for a non-positive or NaN `temperature`.
    /// - [`ModelError::TokenOutOfRange`] for a seed id outside the vocabulary.
    /// - [`ModelError::Sampling`] when the logits are not finite.
    pub fn generate(
        &self,
        seed: &[usize],
        k: usize,
        temperature: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<usize>, ModelError> {
        if seed.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if temperature.is_nan() || temperature <= 0.0 {
            return Err(ModelError::InvalidTemperature(temperature));
        }
        let mut ids = seed.to_vec();
        for _ in 0..k {
            let start = ids.len().saturating_sub(self.context_length());
            let (logits, _) = self.forward(&ids[start..], 1, None, Mode::Inference, rng)?;
            let last: Vec<f64> = logits
                .row(logits.rows() - 1)
                .iter()
                .map(|l| l / temperature)
                .collect();
            let probs = softmax(&last);
            let next = WeightedIndex::new(&probs)
                .map_err(|e| ModelError::Sampling(e.to_string()))?
                .sample(rng);
            ids.push(next);
        }
        Ok(ids)
    }
}

impl Module for LanguageModel {
    fn named_parameters(&self, prefix: &str) -> Vec<(String, Tensor)> {
        let mut params = self
            .token_embedding
            .named_parameters(&join(prefix, "token_embedding"));
        params.extend(
            self.position_embedding
                .named_parameters(&join(prefix, "position_embedding")),
        );
        for (i, block) in self.blocks.iter().enumerate() {
            params.extend(block.named_parameters(&join(prefix, &format!("blocks.{i}"))));
        }
        params.extend(self.ln_final.named_parameters(&join(prefix, "ln_final")));
        params.extend(self.lm_head.named_parameters(&join(prefix, "lm_head")));
        params
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::tokenizer::{CharTokenizer, Tokenizer};

    fn tiny_config() -> Config {
        Config {
            context_length: 8,
            model_width: 16,
            num_heads: 4,
            num_layers: 2,
            dropout_rate: 0.0,
            ..Config::default()
        }
    }

    #[test]
    fn parameter_count_without_blocks() {
        let config = Config {
            model_width: 32,
            num_layers: 0,
            ..Config::default()
        };
        let vocab = 10;
        let mut rng = StdRng::seed_from_u64(1);
        let model = LanguageModel::new(&config, vocab, &mut rng).unwrap();
        let token_embedding = vocab * 32;
        let positions = config.context_length * 32;
        let ln_final = 2 * 32;
        let lm_head = 32 * vocab + vocab;
        assert_eq!(
            model.num_parameters(),
            token_embedding + positions + ln_final + lm_head
        );

        let sizes: std::collections::HashMap<String, usize> = model
            .named_parameters()
            .into_iter()
            .map(|(name, t)| (name, t.len()))
            .collect();
        assert_eq!(sizes.len(), 7);
        assert_eq!(sizes["token_embedding.weight"], token_embedding);
        assert_eq!(sizes["position_embedding.weight"], positions);
        assert_eq!(sizes["ln_final.gain"] + sizes["ln_final.bias"], ln_final);
        assert_eq!(sizes["lm_head.weight"] + sizes["lm_head.bias"], lm_head);
        assert_eq!(sizes["lm_head.bias"], vocab);
        assert!(model.blocks().is_empty());
    }

    #[test]
    fn parameter_count_with_blocks() {
        let config = tiny_config();
        let (w, v, c) = (16, 7, 8);
        let mut rng = StdRng::seed_from_u64(2);
        let model = LanguageModel::new(&config, v, &mut rng).unwrap();
        let per_block = 2 * w + 3 * w * w + (w * w + w) + 2 * w + (w * 4 * w + 4 * w) + (4 * w * w + w);
        let expected = v * w + c * w + 2 * per_block + 2 * w + (w * v + v);
        assert_eq!(model.num_parameters(), expected);
    }

    #[test]
    fn named_parameters_are_ordered_and_unique() {
        let mut rng = StdRng::seed_from_u64(3);
        let model = LanguageModel::new(&tiny_config(), 5, &mut rng).unwrap();
        let names: Vec<String> = model.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names[0], "token_embedding.weight");
        assert_eq!(names[1], "position_embedding.weight");
        assert_eq!(names[2], "blocks.0.ln_1.gain");
        assert_eq!(names.last().unwrap(), "lm_head.bias");
        assert!(names.contains(&"blocks.1.attention.heads.3.query.weight".to_string()));
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn forward_shapes_and_initial_loss() {
        let mut rng = StdRng::seed_from_u64(4);
        let vocab = 6;
        let model = LanguageModel::new(&tiny_config(), vocab, &mut rng).unwrap();
        let ids: Vec<usize> = (0..3 * 5).map(|i| i % vocab).collect();
        let targets: Vec<usize> = (0..3 * 5).map(|i| (i + 1) % vocab).collect();
        let (logits, loss) = model
            .forward(&ids, 3, Some(&targets), Mode::Training, &mut rng)
            .unwrap();
        assert_eq!(logits.shape(), (15, vocab));
        let loss = loss.unwrap().item();
        // small init keeps the initial loss near ln(vocab)
        assert!((loss - (vocab as f64).ln()).abs() < 0.5, "loss {loss}");
    }

    #[test]
    fn forward_without_targets_has_no_loss() {
        let mut rng = StdRng::seed_from_u64(5);
        let model = LanguageModel::new(&tiny_config(), 4, &mut rng).unwrap();
        let (_, loss) = model
            .forward(&[0, 1, 2], 1, None, Mode::Inference, &mut rng)
            .unwrap();
        assert!(loss.is_none());
    }

    #[test]
    fn forward_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(6);
        let model = LanguageModel::new(&tiny_config(), 4, &mut rng).unwrap();
        let mode = Mode::Inference;
        assert_eq!(
            model.forward(&[], 1, None, mode, &mut rng).unwrap_err(),
            ModelError::EmptyInput
        );
        assert_eq!(
            model.forward(&[0; 9], 1, None, mode, &mut rng).unwrap_err(),
            ModelError::SequenceTooLong { len: 9, max: 8 }
        );
        assert_eq!(
            model.forward(&[0, 4], 1, None, mode, &mut rng).unwrap_err(),
            ModelError::TokenOutOfRange {
                id: 4,
                vocab_size: 4
            }
        );
        assert!(matches!(
            model.forward(&[0, 1, 2], 2, None, mode, &mut rng),
            Err(ModelError::ShapeMismatch(_))
        ));
        assert!(matches!(
            model.forward(&[0, 1], 1, Some(&[1]), mode, &mut rng),
            Err(ModelError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn inference_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = Config {
            dropout_rate: 0.5,
            ..tiny_config()
        };
        let model = LanguageModel::new(&config, 5, &mut rng).unwrap();
        let (a, _) = model.forward(&[1, 2, 3], 1, None, Mode::Inference, &mut rng).unwrap();
        let (b, _) = model.forward(&[1, 2, 3], 1, None, Mode::Inference, &mut rng).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn earlier_logits_ignore_later_tokens() {
        let mut rng = StdRng::seed_from_u64(8);
        let model = LanguageModel::new(&tiny_config(), 5, &mut rng).unwrap();
        let (a, _) = model.forward(&[1, 2, 3, 4], 1, None, Mode::Inference, &mut rng).unwrap();
        let (b, _) = model.forward(&[1, 2, 0, 0], 1, None, Mode::Inference, &mut rng).unwrap();
        for r in 0..2 {
            for (x, y) in a.row(r).iter().zip(b.row(r)) {
                assert!((x - y).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn generate_from_untrained_model() {
        let mut rng = StdRng::seed_from_u64(9);
        let model = LanguageModel::new(&tiny_config(), 5, &mut rng).unwrap();
        let ids = model.generate(&[0], 5, 1.0, &mut rng).unwrap();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[0], 0);
        assert!(ids.iter().all(|&id| id < 5));
    }

    #[test]
    fn generate_crops_to_context_length() {
        let mut rng = StdRng::seed_from_u64(10);
        let model = LanguageModel::new(&tiny_config(), 3, &mut rng).unwrap();
        let ids = model.generate(&[1; 8], 20, 0.8, &mut rng).unwrap();
        assert_eq!(ids.len(), 28);
    }

    #[test]
    fn generate_is_reproducible_with_seed() {
        let mut rng = StdRng::seed_from_u64(11);
        let model = LanguageModel::new(&tiny_config(), 5, &mut rng).unwrap();
        let a = model.generate(&[2], 10, 1.0, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = model.generate(&[2], 10, 1.0, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generate_rejects_empty_seed_and_bad_temperature() {
        let mut rng = StdRng::seed_from_u64(12);
        let model = LanguageModel::new(&tiny_config(), 5, &mut rng).unwrap();
        assert_eq!(
            model.generate(&[], 3, 1.0, &mut rng).unwrap_err(),
            ModelError::EmptyInput
        );
        assert_eq!(
            model.generate(&[0], 3, 0.0, &mut rng).unwrap_err(),
            ModelError::InvalidTemperature(0.0)
        );
    }

    #[test]
    fn generate_text_round_trips_through_tokenizer() {
        let tokenizer = CharTokenizer::from_corpus("hello world");
        let mut rng = StdRng::seed_from_u64(13);
        let model = LanguageModel::new(&tiny_config(), tokenizer.vocab_size(), &mut rng).unwrap();

        let text = generate_text(&model, &tokenizer, "he", 5, 1.0, &mut rng).unwrap();
        assert_eq!(text.chars().count(), 7);
        assert!(text.starts_with("he"));

        let from_empty = generate_text(&model, &tokenizer, "", 4, 1.0, &mut rng).unwrap();
        assert_eq!(from_empty.chars().count(), 5);
        assert!(from_empty.starts_with(' '), "start token is id 0, the space");

        assert!(matches!(
            generate_text(&model, &tokenizer, "xyz", 1, 1.0, &mut rng),
            Err(ModelError::Tokenizer(_))
        ));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut rng = StdRng::seed_from_u64(14);
        let bad = Config {
            model_width: 10,
            num_heads: 4,
            ..Config::default()
        };
        assert!(matches!(
            LanguageModel::new(&bad, 5, &mut rng),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            LanguageModel::new(&Config::default(), 0, &mut rng),
            Err(ModelError::InvalidConfig(_))
        ));
        let negative_std = Config {
            init_std: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            LanguageModel::new(&negative_std, 5, &mut rng),
            Err(ModelError::InvalidConfig(_))
        ));
    }
}
