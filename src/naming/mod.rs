//! Host naming.
//!
//! After a topology is built, infrastructure hosts are given readable,
//! unique labels drawn from a word list.

pub mod corpus;
pub mod hostnames;

pub use corpus::{WordCorpus, DEFAULT_WORDS_PATH};
pub use hostnames::{HostnameAssigner, NamingScope, DEFAULT_HOST_PREFIX};

use crate::repository::RepoError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    #[error("word corpus has {available} usable words, {required} hosts need a name")]
    InsufficientCorpus { available: usize, required: usize },

    #[error("failed to read word corpus {path:?}: {source}")]
    CorpusIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepoError),
}
