//! Builder type definitions: stages, options, results and errors.

use crate::naming::NamingError;
use crate::repository::RepoError;
use std::fmt;

/// Construction stages, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CreateIsds,
    CreateAses,
    BootstrapTrust,
    CreateLinks,
    CreateVpns,
    CreateExtraServices,
    NameHosts,
}


impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateIsds => "create ISDs",
            Self::CreateAses => "create ASes",
            Self::BootstrapTrust => "bootstrap trust material",
            Self::CreateLinks => "create links",
            Self::CreateVpns => "create VPNs",
            Self::CreateExtraServices => "create extra services",
            Self::NameHosts => "name hosts",
        };
        f.write_str(name)
    }
}

/// Errors aborting a build
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("stage '{stage}' failed at {entry}: {source}")]
    Stage {
        stage: Stage,
        entry: String,
        #[source]
        source: RepoError,
    },

    #[error("stage '{}' failed: {0}", Stage::NameHosts)]
    Naming(#[from] NamingError),
}

impl BuildError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Stage { stage, .. } => *stage,
            Self::Naming(_) => Stage::NameHosts,
        }
    }

    /// The repository error behind a failed stage, if any
    pub fn repo_error(&self) -> Option<&RepoError> {
        match self {
            Self::Stage { source, .. } => Some(source),
            Self::Naming(NamingError::Repository(source)) => Some(source),
            Self::Naming(_) => None,
        }
    }
}

/// Builder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    /// Update the trust material of independent ISDs on the rayon pool
    pub parallel_trust_bootstrap: bool,
}

/// Number of entities each stage produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub isds: usize,
    pub ases: usize,
    pub attachment_points: usize,
    pub trust_bootstraps: usize,
    pub links: usize,
    pub vpns: usize,
    pub extra_services: usize,
    pub hosts_named: usize,
}
