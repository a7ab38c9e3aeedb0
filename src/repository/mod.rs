//! Entity repository.
//!
//! The [`EntityRepository`] trait is the only thing the topology builder
//! talks to. All lookups go through natural keys (`isd_id`, `as_id`) or
//! repository ids, so callers never hold on to stale entity handles.
//!
//! ## Side effects
//!
//! Some operations create or touch more than the entity they are named after:
//!
//! - [`EntityRepository::create_as_with_defaults`] also creates one default
//!   host for the AS and the [`ServiceType::DEFAULTS`] services on it. Unless
//!   `defer_trust_init` is set, it then updates the trust material of the
//!   AS's ISD.
//! - [`EntityRepository::update_trust_material`] bumps the TRC version of the
//!   ISD and the certificate version of every AS in it.
//! - [`EntityRepository::create_link`] allocates a new interface on both ASes.
//!   Interface ids are bounded by the public port range, see
//!   [`memory::MAX_INTERFACE_ID`].
//!
//! [`InMemoryRepository`] is a thread-safe implementation of the trait.

pub mod memory;

pub use memory::{InMemoryRepository, TopologySnapshot};

use crate::model::{
    As, AsId, AttachmentPoint, EntityId, Host, Isd, IsdId, Link, LinkType, Service, ServiceType,
    Vpn,
};

/// Errors returned by repository operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} {key} already exists")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("{entity} {key} does not exist")]
    NotFound { entity: &'static str, key: String },

    #[error("expected exactly one {entity} for {key}, found several")]
    MultipleFound { entity: &'static str, key: String },

    #[error("no {entity} left for {key}")]
    Exhausted { entity: &'static str, key: String },
}

impl RepoError {
    pub fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        Self::DuplicateKey {
            entity,
            key: key.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn exhausted(entity: &'static str, key: impl ToString) -> Self {
        Self::Exhausted {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Parameters for [`EntityRepository::create_as_with_defaults`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAs {
    pub isd_id: IsdId,
    pub as_id: AsId,
    pub label: String,
    pub is_core: bool,
    pub public_ip: String,
    /// `None` for infrastructure ASes
    pub owner: Option<String>,
    /// Skip trust material generation; the caller bootstraps the ISD later
    pub defer_trust_init: bool,
}

/// Host selection for [`EntityRepository::list_hosts`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostFilter {
    #[default]
    All,
    /// Hosts without an owner
    Infrastructure,
    /// Hosts without an owner that have no label yet
    UnlabeledInfrastructure,
}

impl HostFilter {
    pub fn matches(&self, host: &Host) -> bool {
        match self {
            Self::All => true,
            Self::Infrastructure => host.owner.is_none(),
            Self::UnlabeledInfrastructure => host.owner.is_none() && host.label.is_none(),
        }
    }
}

/// Persistence operations used to construct a topology.
///
/// Implementations must be safe to call concurrently for distinct natural
/// keys.
pub trait EntityRepository: Send + Sync {
    fn create_isd(&self, isd_id: IsdId, label: &str) -> RepoResult<Isd>;

    fn get_isd(&self, isd_id: IsdId) -> RepoResult<Isd>;

    /// All ISDs, ordered by id
    fn list_isds(&self) -> Vec<Isd>;

    /// Create an AS together with its default host and services.
    ///
    /// Fails with `NotFound` if the ISD does not exist and `DuplicateKey` if
    /// the AS id is taken.
    fn create_as_with_defaults(&self, new_as: NewAs) -> RepoResult<As>;

    fn get_as(&self, as_id: &str) -> RepoResult<As>;

    /// All ASes, ordered by creation
    fn list_ases(&self) -> Vec<As>;

    /// Generate or roll over the TRC of an ISD and the certificates of its ASes.
    fn update_trust_material(&self, isd_id: IsdId) -> RepoResult<Isd>;

    /// Mark an AS as attachment point. Fails with `DuplicateKey` if it already is one.
    fn create_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint>;

    fn get_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint>;

    /// Persist a modified attachment point.
    fn save_attachment_point(&self, attachment_point: &AttachmentPoint) -> RepoResult<AttachmentPoint>;

    fn list_attachment_points(&self) -> Vec<AttachmentPoint>;

    /// Create a link; for [`LinkType::Provider`], `as_id_a` is the provider.
    ///
    /// Fails with `Exhausted` if either AS has no interface id left.
    fn create_link(&self, link_type: LinkType, as_id_a: &str, as_id_b: &str) -> RepoResult<Link>;

    fn list_links(&self) -> Vec<Link>;

    /// The one host of an AS
    fn get_sole_host(&self, as_id: &str) -> RepoResult<Host>;

    /// Hosts matching `filter`, ordered by id
    fn list_hosts(&self, filter: HostFilter) -> Vec<Host>;

    /// Persist a modified host.
    fn save_host(&self, host: &Host) -> RepoResult<Host>;

    fn create_vpn(
        &self,
        server_host_id: EntityId,
        server_vpn_ip: &str,
        server_port: u16,
        subnet: &str,
    ) -> RepoResult<Vpn>;

    fn list_vpns(&self) -> Vec<Vpn>;

    fn create_service(
        &self,
        host_id: EntityId,
        as_id: &str,
        service_type: ServiceType,
    ) -> RepoResult<Service>;

    /// Services of one AS, ordered by id
    fn list_services(&self, as_id: &str) -> Vec<Service>;
}
