//! Topology entity model.
//!
//! Plain data records for ISDs, ASes, hosts, services, links, attachment
//! points and VPNs as stored by the entity repository.

pub mod types;

pub use types::{
    As, AsId, AttachmentPoint, Created, EntityId, Host, Interface, Isd, IsdId, Link, LinkType,
    Service, ServiceType, Vpn,
};
