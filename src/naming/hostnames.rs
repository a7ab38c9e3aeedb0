//! Host label assignment.
//!
//! Infrastructure hosts get labels of the form
//! `<prefix>-<AS suffix>-<word>`, e.g. `scionlab-1101-walrus`, with the
//! words drawn without replacement from a [`WordCorpus`].

use super::{NamingError, WordCorpus};
use crate::model::Host;
use crate::repository::{EntityRepository, HostFilter};
use crate::utils::as_id::as_id_suffix;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Default label prefix
pub const DEFAULT_HOST_PREFIX: &str = "scionlab";

/// Which hosts receive a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingScope {
    /// Every infrastructure host, replacing existing labels
    #[default]
    AllInfrastructure,
    /// Only infrastructure hosts without a label
    UnlabeledOnly,
}

impl NamingScope {
    fn host_filter(&self) -> HostFilter {
        match self {
            Self::AllInfrastructure => HostFilter::Infrastructure,
            Self::UnlabeledOnly => HostFilter::UnlabeledInfrastructure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostnameAssigner {
    corpus: WordCorpus,
    prefix: String,
    seed: Option<u64>,
    scope: NamingScope,
}

impl HostnameAssigner {
    pub fn new(corpus: WordCorpus) -> Self {
        Self {
            corpus,
            prefix: DEFAULT_HOST_PREFIX.to_string(),
            seed: None,
            scope: NamingScope::default(),
        }
    }

    /// Fix the sampling seed so repeated runs pick the same words.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_scope(mut self, scope: NamingScope) -> Self {
        self.scope = scope;
        self
    }

    /// Label for a host of `as_id` using `word`
    pub fn label_for(&self, as_id: &str, word: &str) -> String {
        format!("{}-{}-{}", self.prefix, as_id_suffix(as_id), word)
    }

    /// Draw `count` distinct words in sample order.
    pub fn sample_words(&self, count: usize) -> Result<Vec<&str>, NamingError> {
        if count > self.corpus.len() {
            return Err(NamingError::InsufficientCorpus {
                available: self.corpus.len(),
                required: count,
            });
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let words = self.corpus.words();
        Ok(index::sample(&mut rng, words.len(), count)
            .into_iter()
            .map(|i| words[i].as_str())
            .collect())
    }

    /// Label the candidate hosts and persist them.
    ///
    /// Hosts are taken in repository order (ascending id) and paired with
    /// the sampled words in sample order. Nothing is written if the corpus
    /// is too small.
    pub fn assign<R>(&self, repo: &R) -> Result<Vec<Host>, NamingError>
    where
        R: EntityRepository + ?Sized,
    {
        let hosts = repo.list_hosts(self.scope.host_filter());
        let words = self.sample_words(hosts.len())?;

        let mut named = Vec::with_capacity(hosts.len());
        for (mut host, word) in hosts.into_iter().zip(words) {
            let label = self.label_for(&host.as_id, word);
            debug!("Host {} of AS {} -> {}", host.id, host.as_id, label);
            host.label = Some(label);
            named.push(repo.save_host(&host)?);
        }
        info!("Assigned labels to {} infrastructure hosts", named.len());
        Ok(named)
    }
}
