//! Entity type definitions.
//!
//! These records are what the repository hands back from its create/get
//! operations. Cross-entity relationships are held as natural keys
//! (`isd_id`, `as_id`) or repository ids, never as references to other
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric isolation domain identifier
pub type IsdId = u16;

/// Canonical AS identifier, e.g. `ffaa:0:1101`
pub type AsId = String;

/// Repository-assigned id for hosts, services, links and VPNs
pub type EntityId = u64;

/// Creation metadata stamped on every entity by the repository.
///
/// `seq` is a strictly increasing counter shared by all entity kinds, so
/// it orders creations even when timestamps collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

/// Isolation domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Isd {
    pub isd_id: IsdId,
    pub label: String,
    /// Current TRC version; 0 until trust material is first generated
    pub trc_version: u32,
    pub created: Created,
}

impl Isd {
    pub fn has_trust_material(&self) -> bool {
        self.trc_version > 0
    }
}

/// Autonomous system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct As {
    pub as_id: AsId,
    pub isd_id: IsdId,
    pub label: String,
    pub public_ip: String,
    pub is_core: bool,
    /// `None` for infrastructure ASes
    pub owner: Option<String>,
    /// Set when trust material was not generated on creation
    pub trust_deferred: bool,
    /// AS certificate version; 0 until trust material is generated
    pub certificate_version: u32,
    pub created: Created,
}

/// Machine running the services of an AS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: EntityId,
    pub as_id: AsId,
    /// Inherited from the AS; `None` for infrastructure hosts
    pub owner: Option<String>,
    pub public_ip: String,
    pub label: Option<String>,
    pub created: Created,
}

/// Service roles that can run on a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
    /// Control service
    #[serde(rename = "CS")]
    ControlService,
    /// Colibri service
    #[serde(rename = "CO")]
    Colibri,
    /// Bandwidth test server
    #[serde(rename = "BW")]
    BandwidthTester,
    /// Pingpong test server
    #[serde(rename = "PP")]
    PingPong,
    /// SCION IP gateway
    #[serde(rename = "SIG")]
    IpGateway,
}

impl ServiceType {
    /// Services provisioned on the default host of every new AS
    pub const DEFAULTS: [ServiceType; 3] = [
        ServiceType::ControlService,
        ServiceType::Colibri,
        ServiceType::BandwidthTester,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::ControlService => "CS",
            Self::Colibri => "CO",
            Self::BandwidthTester => "BW",
            Self::PingPong => "PP",
            Self::IpGateway => "SIG",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: EntityId,
    pub host_id: EntityId,
    pub as_id: AsId,
    pub service_type: ServiceType,
    pub created: Created,
}

/// Link types between two ASes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkType {
    /// Between two core ASes
    Core,
    /// Parent/child link; the first AS of the pair is the provider
    Provider,
    /// Peering link
    Peer,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Core => "CORE",
            Self::Provider => "PROVIDER",
            Self::Peer => "PEER",
        };
        f.write_str(name)
    }
}

/// One end of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub as_id: AsId,
    pub host_id: EntityId,
    pub interface_id: u16,
    pub public_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: EntityId,
    pub link_type: LinkType,
    /// Provider side for [`LinkType::Provider`]
    pub interface_a: Interface,
    /// Customer side for [`LinkType::Provider`]
    pub interface_b: Interface,
    pub created: Created,
}

impl Link {
    /// The provider AS of a provider link, `None` for other link types.
    pub fn provider(&self) -> Option<&str> {
        match self.link_type {
            LinkType::Provider => Some(&self.interface_a.as_id),
            _ => None,
        }
    }

    /// The customer AS of a provider link, `None` for other link types.
    pub fn customer(&self) -> Option<&str> {
        match self.link_type {
            LinkType::Provider => Some(&self.interface_b.as_id),
            _ => None,
        }
    }
}

/// Marks an AS as able to host user AS attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPoint {
    pub as_id: AsId,
    pub vpn_id: Option<EntityId>,
    pub created: Created,
}

/// VPN overlay served from an infrastructure host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpn {
    pub id: EntityId,
    pub server_host_id: EntityId,
    pub server_vpn_ip: String,
    pub server_port: u16,
    pub subnet: String,
    pub created: Created,
}
