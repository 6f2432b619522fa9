//! Text-level generation: encode a prompt, extend it with the model, decode.

use rand::rngs::StdRng;

use super::{LanguageModel, ModelError};
use crate::tokenizer::Tokenizer;

/// Id generation starts from when the seed text is empty.
pub const START_TOKEN: usize = 0;

/// Encodes `seed_text`, samples `k` more tokens and decodes the whole sequence.
///
/// An empty `seed_text` starts from [`START_TOKEN`], which is then part of the output.
///
/// # Errors
///
/// - [`ModelError::Tokenizer`] if `seed_text` contains a character outside the vocabulary.
/// - Any error of [`LanguageModel::generate`].
pub fn generate_text<T: Tokenizer>(
    model: &LanguageModel,
    tokenizer: &T,
    seed_text: &str,
    k: usize,
    temperature: f64,
    rng: &mut StdRng,
) -> Result<String, ModelError> {
    let mut seed = tokenizer.encode(seed_text)?;
    if seed.is_empty() {
        seed.push(START_TOKEN);
    }
    let ids = model.generate(&seed, k, temperature, rng)?;
    Ok(tokenizer.decode(&ids)?)
}
