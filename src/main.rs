//! # babygpt
//!
//! Trains a character-level GPT on a text file, prints a sample and saves a checkpoint.
//! Configured entirely through `BABYGPT_*` environment variables; log level via `RUST_LOG`.

use anyhow::{Context, Result};
use babygpt_core::checkpoint;
use babygpt_core::config::{from_env, Config};
use babygpt_core::data::{load_corpus, Dataset};
use babygpt_core::model::{generate_text, LanguageModel};
use babygpt_core::nn::Module;
use babygpt_core::tokenizer::{CharTokenizer, Tokenizer};
use babygpt_core::train::Trainer;
use log::{debug, info, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = from_env().context("reading configuration")?;
    config.validate().context("validating configuration")?;
    run(&config)
}

fn run(config: &Config) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let corpus = load_corpus(&config.input_path)
        .with_context(|| format!("loading corpus {}", config.input_path.display()))?;
    let tokenizer = CharTokenizer::from_corpus(corpus.as_str());
    info!(
        "corpus: {} characters, vocab size {}",
        corpus.char_count(),
        tokenizer.vocab_size()
    );
    let tokens = tokenizer.encode(corpus.as_str())?;
    let dataset = Dataset::split(tokens, config.train_split, config.context_length)
        .context("splitting dataset")?;

    let model = LanguageModel::new(config, tokenizer.vocab_size(), &mut rng)?;
    report_parameters(&model);

    let mut trainer = Trainer::new(model, config, dataset, rng);
    let reports = trainer.train()?;
    if let Some(last) = reports.last() {
        info!("finished {} steps, final train loss {:.4}", last.step, last.train_loss);
    }
    let (model, mut rng) = trainer.into_parts();

    let text = generate_text(
        &model,
        &tokenizer,
        &config.prompt,
        config.generate_tokens,
        config.temperature,
        &mut rng,
    )
    .context("generating text")?;
    println!("{text}");

    checkpoint::save(&config.checkpoint_path, &model, &tokenizer)
        .with_context(|| format!("saving checkpoint {}", config.checkpoint_path.display()))?;
    Ok(())
}

fn report_parameters(model: &LanguageModel) {
    let total = model.num_parameters();
    let megabytes = (total * std::mem::size_of::<f64>()) as f64 / 1024.0 / 1024.0;
    info!("total parameters: {total} ({megabytes:.2} MB)");
    for (name, tensor) in model.named_parameters() {
        debug!("{name}: {} parameters", tensor.len());
    }
}
