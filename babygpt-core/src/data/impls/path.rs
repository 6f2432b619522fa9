//! [`DataLoader`](super::super::DataLoader) implementation that reads a whole UTF-8 file as the corpus.

use std::fs;
use std::path::Path;

use log::debug;

use super::super::{Corpus, DataError, DataLoader};

/// Loads the corpus from a file path. The file is read fully; no line splitting or trimming.
#[derive(Clone, Debug)]
pub struct PathLoader<P>(pub P);

impl<P> PathLoader<P>
where
    P: AsRef<Path>,
{
    /// Creates a loader for the given path.
    #[must_use]
    pub fn new(path: P) -> Self {
        PathLoader(path)
    }
}

impl<P> DataLoader for PathLoader<P>
where
    P: AsRef<Path>,
{
    fn load(&self) -> Result<Corpus, DataError> {
        let path = self.0.as_ref();
        let content = fs::read_to_string(path)?;
        debug!("read {} bytes from {}", content.len(), path.display());
        Corpus::new(content)
    }
}

/// Convenience: load the corpus from a path using [`PathLoader`].
///
/// # Errors
///
/// - [`DataError::Io`] when the path cannot be read or content is not valid UTF-8.
/// - [`DataError::EmptyCorpus`] when the file is empty.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Corpus, DataError> {
    PathLoader::new(path).load()
}
