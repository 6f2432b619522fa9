//! Training data: corpus loading, train/validation split and batch sampling.
//!
//! This module defines the **trait** ([`DataLoader`]), **models** ([`Corpus`], [`Dataset`], [`Batch`])
//! and **error** ([`DataError`]). Loader implementations (e.g. [`PathLoader`]) live in the `impls` submodule.

mod batch;
mod corpus;
mod dataset;
mod error;
mod impls;

pub use batch::{sample_batch, Batch};
pub use corpus::Corpus;
pub use dataset::{Dataset, Split};
pub use error::DataError;
pub use impls::{load_corpus, PathLoader};

/// Trait for loading the training corpus.
pub trait DataLoader {
    /// Loads the corpus. Returns [`Corpus`] or a [`DataError`].
    fn load(&self) -> Result<Corpus, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;
    use std::io::Write;
    use std::path::Path;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn load_corpus_reads_whole_file_verbatim() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "first line\n  second line  \n\nthird").unwrap();
        f.flush().unwrap();

        let corpus = load_corpus(f.path()).unwrap();
        assert_eq!(corpus.as_str(), "first line\n  second line  \n\nthird");
        assert_eq!(corpus.char_count(), 33);
    }

    #[test]
    fn load_corpus_empty_file_returns_empty_corpus_error() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let result = load_corpus(f.path());
        assert!(matches!(result, Err(DataError::EmptyCorpus)));
    }

    #[test]
    fn load_corpus_missing_file_returns_io_error() {
        let path = Path::new("/nonexistent/babygpt_never_exists.txt");
        let result = load_corpus(path);
        assert!(matches!(result, Err(DataError::Io(_))));
    }

    #[test]
    fn path_loader_implements_trait() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "hello").unwrap();
        let loader = PathLoader::new(&path);
        assert_eq!(loader.load().unwrap().as_str(), "hello");
    }

    #[test]
    fn data_error_display_and_source() {
        let e = DataError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(e.to_string().contains("file not found"));
        assert!(e.source().is_some());

        let e = DataError::InsufficientData {
            split: "validation",
            needed: 9,
            available: 3,
        };
        assert_eq!(
            e.to_string(),
            "data: validation split has 3 tokens, needs at least 9"
        );
        assert!(e.source().is_none());
    }

    #[test]
    fn dataset_split_keeps_order() {
        let tokens: Vec<usize> = (0..100).collect();
        let ds = Dataset::split(tokens, 0.9, 4).unwrap();
        assert_eq!(ds.train().len(), 90);
        assert_eq!(ds.train()[89], 89);
        let val = ds.validation().unwrap();
        assert_eq!(val, &(90..100).collect::<Vec<_>>()[..]);
        assert_eq!(ds.tokens(Split::Train).unwrap().len(), 90);
    }

    #[test]
    fn dataset_without_validation_split() {
        let ds = Dataset::split((0..10).collect(), 1.0, 4).unwrap();
        assert_eq!(ds.train().len(), 10);
        assert!(ds.validation().is_none());
        assert!(ds.tokens(Split::Validation).is_none());
    }

    #[test]
    fn dataset_rejects_short_validation_split() {
        let result = Dataset::split((0..20).collect(), 0.9, 4);
        assert!(matches!(
            result,
            Err(DataError::InsufficientData {
                split: "validation",
                needed: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn dataset_rejects_short_train_split() {
        let result = Dataset::split((0..8).collect(), 1.0, 8);
        assert!(matches!(
            result,
            Err(DataError::InsufficientData {
                split: "train",
                needed: 9,
                available: 8
            })
        ));
    }

    #[test]
    fn batch_shapes_and_target_offset() {
        let tokens: Vec<usize> = (0..50).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let batch = sample_batch(&tokens, 4, 8, &mut rng);
        assert_eq!(batch.inputs.len(), 4 * 8);
        assert_eq!(batch.targets.len(), 4 * 8);
        for i in 0..4 {
            let row = &batch.inputs[i * 8..(i + 1) * 8];
            let target_row = &batch.targets[i * 8..(i + 1) * 8];
            // tokens are their own positions, so the window must be contiguous
            for t in 0..8 {
                assert_eq!(row[t], row[0] + t);
                assert_eq!(target_row[t], row[t] + 1);
            }
            assert!(row[0] + 8 < tokens.len());
        }
    }

    #[test]
    fn batch_from_minimal_sequence_uses_offset_zero() {
        let tokens = vec![3, 1, 4, 1, 5];
        let mut rng = StdRng::seed_from_u64(0);
        let batch = sample_batch(&tokens, 3, 4, &mut rng);
        assert_eq!(batch.inputs, [3, 1, 4, 1].repeat(3));
        assert_eq!(batch.targets, [1, 4, 1, 5].repeat(3));
    }

    #[test]
    fn batch_sampling_is_reproducible_with_seed() {
        let tokens: Vec<usize> = (0..200).collect();
        let a = sample_batch(&tokens, 5, 10, &mut StdRng::seed_from_u64(42));
        let b = sample_batch(&tokens, 5, 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn corpus_new_rejects_empty() {
        assert!(matches!(Corpus::new(""), Err(DataError::EmptyCorpus)));
        assert_eq!(Corpus::new(" ").unwrap().to_string(), " ");
    }
}
