//! Word corpus for host names.

use super::NamingError;
use log::{debug, info};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

/// System dictionary used when no corpus is given
pub const DEFAULT_WORDS_PATH: &str = "/usr/share/dict/words";

/// Only plain lowercase ASCII words make it into host names
static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+$").expect("Invalid word regex"));

/// Filtered, deduplicated list of candidate words, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCorpus {
    words: Vec<String>,
}

impl WordCorpus {
    /// Build a corpus from raw words, keeping the first occurrence of each.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| WORD_PATTERN.is_match(w))
            .filter(|w| seen.insert(w.clone()))
            .collect();
        Self { words }
    }

    /// Load a newline-separated word list.
    pub fn load(path: &Path) -> Result<Self, NamingError> {
        info!("Loading word corpus from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| NamingError::CorpusIo {
            path: path.to_path_buf(),
            source,
        })?;
        let total = content.lines().count();
        let corpus = Self::from_words(content.lines());
        debug!("Kept {} of {} words", corpus.len(), total);
        Ok(corpus)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
