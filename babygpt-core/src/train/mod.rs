//! Training loop: sample a batch, forward, backward, clip, AdamW update; evaluate
//! train and validation loss every `eval_interval` steps.

mod error;

pub use error::TrainError;

use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;

use crate::config::Config;
use crate::data::{sample_batch, Dataset, Split};
use crate::model::LanguageModel;
use crate::nn::Mode;
use crate::optim::{clip_grad_norm, AdamW};

/// Average losses measured at one evaluation point.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    /// Number of updates applied before this evaluation.
    pub step: usize,
    pub train_loss: f64,
    /// `None` when the dataset has no validation split.
    pub val_loss: Option<f64>,
}

/// Owns the model, its optimizer, the dataset and the RNG for one training run.
pub struct Trainer {
    model: LanguageModel,
    optimizer: AdamW,
    config: Config,
    dataset: Dataset,
    rng: StdRng,
    step: usize,
}

impl Trainer {
    #[must_use]
    pub fn new(model: LanguageModel, config: &Config, dataset: Dataset, rng: StdRng) -> Self {
        let params = model.named_parameters().into_iter().map(|(_, t)| t).collect();
        let optimizer = AdamW::new(params, config);
        Trainer {
            model,
            optimizer,
            config: config.clone(),
            dataset,
            rng,
            step: 0,
        }
    }

    #[must_use]
    pub fn model(&self) -> &LanguageModel {
        &self.model
    }

    /// Hands back the trained model and the RNG (e.g. for generation afterwards).
    #[must_use]
    pub fn into_parts(self) -> (LanguageModel, StdRng) {
        (self.model, self.rng)
    }

    /// Updates applied so far.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Runs `total_steps` updates, evaluating at step 0, every `eval_interval` steps and
    /// after the last step. Returns the evaluation history.
    ///
    /// # Errors
    ///
    /// [`TrainError::Diverged`] as soon as a training loss is not finite.
    pub fn train(&mut self) -> Result<Vec<EvalReport>, TrainError> {
        let started = Instant::now();
        let mut reports = Vec::new();
        let total = self.config.total_steps;
        for step in 0..total {
            if step % self.config.eval_interval == 0 {
                let report = self.estimate_loss()?;
                log_report(&report, started);
                reports.push(report);
            }
            let loss = self.train_step()?;
            debug!("step {step}: loss {loss:.4}");
        }
        let report = self.estimate_loss()?;
        log_report(&report, started);
        reports.push(report);
        Ok(reports)
    }

    /// One optimization step on a fresh training batch. Returns the batch loss.
    ///
    /// # Errors
    ///
    /// [`TrainError::Diverged`] when the loss is NaN or infinite; no update is applied then.
    pub fn train_step(&mut self) -> Result<f64, TrainError> {
        let batch = sample_batch(
            self.dataset.train(),
            self.config.batch_size,
            self.config.context_length,
            &mut self.rng,
        );
        let loss = self.model.loss(&batch, Mode::Training, &mut self.rng)?;
        let value = loss.item();
        if !value.is_finite() {
            return Err(TrainError::Diverged {
                step: self.step,
                loss: value,
            });
        }
        loss.backward();
        clip_grad_norm(self.optimizer.params(), self.config.grad_clip);
        self.optimizer.step();
        self.optimizer.zero_grad();
        self.step += 1;
        Ok(value)
    }

    /// Mean loss over `eval_samples` batches per split, in inference mode.
    ///
    /// # Errors
    ///
    /// [`TrainError::Model`] if a forward pass fails.
    pub fn estimate_loss(&mut self) -> Result<EvalReport, TrainError> {
        let train_loss = self.split_loss(Split::Train)?.unwrap_or(f64::NAN);
        let val_loss = self.split_loss(Split::Validation)?;
        Ok(EvalReport {
            step: self.step,
            train_loss,
            val_loss,
        })
    }

    fn split_loss(&mut self, split: Split) -> Result<Option<f64>, TrainError> {
        let Some(tokens) = self.dataset.tokens(split) else {
            return Ok(None);
        };
        let samples = self.config.eval_samples;
        let mut total = 0.0;
        for _ in 0..samples {
            let batch = sample_batch(
                tokens,
                self.config.batch_size,
                self.config.context_length,
                &mut self.rng,
            );
            total += self
                .model
                .loss(&batch, Mode::Inference, &mut self.rng)?
                .item();
        }
        Ok(Some(total / samples as f64))
    }
}

fn log_report(report: &EvalReport, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64();
    match report.val_loss {
        Some(val) => info!(
            "step {}: train loss {:.4}, val loss {val:.4}, elapsed {elapsed:.1}s",
            report.step, report.train_loss
        ),
        None => info!(
            "step {}: train loss {:.4}, elapsed {elapsed:.1}s",
            report.step, report.train_loss
        ),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::tokenizer::{CharTokenizer, Tokenizer};

    fn small_config() -> Config {
        Config {
            batch_size: 4,
            context_length: 8,
            model_width: 16,
            num_heads: 2,
            num_layers: 1,
            dropout_rate: 0.0,
            learning_rate: 1e-2,
            total_steps: 150,
            eval_interval: 50,
            eval_samples: 4,
            ..Config::default()
        }
    }

    fn trainer_for(text: &str, config: &Config) -> Trainer {
        let tokenizer = CharTokenizer::from_corpus(text);
        let tokens = tokenizer.encode(text).unwrap();
        let dataset = Dataset::split(tokens, config.train_split, config.context_length).unwrap();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let model = LanguageModel::new(config, tokenizer.vocab_size(), &mut rng).unwrap();
        Trainer::new(model, config, dataset, rng)
    }

    #[test]
    fn loss_decreases_on_repetitive_corpus() {
        let text = "abcdefgh".repeat(40);
        let config = small_config();
        let mut trainer = trainer_for(&text, &config);
        let reports = trainer.train().unwrap();
        // step 0, 50, 100, and the final evaluation at 150
        let steps: Vec<usize> = reports.iter().map(|r| r.step).collect();
        assert_eq!(steps, [0, 50, 100, 150]);
        let first = reports.first().unwrap();
        let last = reports.last().unwrap();
        assert!(
            last.train_loss < first.train_loss * 0.5,
            "train loss {} -> {}",
            first.train_loss,
            last.train_loss
        );
        for pair in reports.windows(2) {
            assert!(
                pair[1].train_loss <= pair[0].train_loss,
                "train loss rose from {} at step {} to {} at step {}",
                pair[0].train_loss,
                pair[0].step,
                pair[1].train_loss,
                pair[1].step
            );
        }
        assert!(last.val_loss.unwrap() < first.val_loss.unwrap());
        assert_eq!(trainer.step(), 150);
    }

    #[test]
    fn train_step_returns_finite_loss_and_counts_steps() {
        let text = "hello world ".repeat(20);
        let mut trainer = trainer_for(&text, &small_config());
        let loss = trainer.train_step().unwrap();
        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(trainer.step(), 1);
    }

    #[test]
    fn no_validation_split_reports_none() {
        let config = Config {
            train_split: 1.0,
            total_steps: 2,
            ..small_config()
        };
        let mut trainer = trainer_for(&"xyz".repeat(10), &config);
        let reports = trainer.train().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.val_loss.is_none()));
    }

    #[test]
    fn diverging_loss_stops_training() {
        let text = "abab".repeat(20);
        let mut trainer = trainer_for(&text, &small_config());
        let (_, weight) = trainer
            .model()
            .named_parameters()
            .into_iter()
            .find(|(name, _)| name == "lm_head.bias")
            .unwrap();
        weight.set_data(vec![f64::NAN; weight.len()]);
        let err = trainer.train_step().unwrap_err();
        assert!(matches!(err, TrainError::Diverged { step: 0, .. }));
        assert_eq!(trainer.step(), 0);
    }

    #[test]
    fn evaluation_does_not_change_parameters() {
        let mut trainer = trainer_for(&"the cat sat ".repeat(10), &small_config());
        let before: Vec<Vec<f64>> = trainer
            .model()
            .named_parameters()
            .iter()
            .map(|(_, t)| t.data())
            .collect();
        let report = trainer.estimate_loss().unwrap();
        assert_eq!(report.step, 0);
        let after: Vec<Vec<f64>> = trainer
            .model()
            .named_parameters()
            .iter()
            .map(|(_, t)| t.data())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn error_display() {
        let e = TrainError::Diverged {
            step: 12,
            loss: f64::INFINITY,
        };
        assert_eq!(e.to_string(), "train: loss diverged to inf at step 12");
    }
}
