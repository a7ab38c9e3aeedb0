//! In-memory entity repository.
//!
//! All state lives behind a single `RwLock`, so every operation, including
//! the multi-entity ones like AS creation, is atomic with respect to
//! concurrent callers.

use super::{EntityRepository, HostFilter, NewAs, RepoError, RepoResult};
use crate::model::{
    As, AsId, AttachmentPoint, Created, EntityId, Host, Interface, Isd, IsdId, Link, LinkType,
    Service, ServiceType, Vpn,
};
use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// First public port used for link interfaces; interface `n` listens on `BASE + n`
pub const INTERFACE_PORT_BASE: u16 = 50000;

/// Highest interface id whose public port still fits in a `u16`
pub const MAX_INTERFACE_ID: u16 = u16::MAX - INTERFACE_PORT_BASE;

#[derive(Debug, Default)]
struct Store {
    seq: u64,
    next_id: EntityId,
    isds: BTreeMap<IsdId, Isd>,
    ases: BTreeMap<AsId, As>,
    hosts: BTreeMap<EntityId, Host>,
    services: BTreeMap<EntityId, Service>,
    links: BTreeMap<EntityId, Link>,
    attachment_points: BTreeMap<AsId, AttachmentPoint>,
    vpns: BTreeMap<EntityId, Vpn>,
    next_interface_id: HashMap<AsId, u16>,
}

impl Store {
    fn stamp(&mut self) -> Created {
        self.seq += 1;
        Created {
            seq: self.seq,
            at: Utc::now(),
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn hosts_of<'a>(&'a self, as_id: &'a str) -> impl Iterator<Item = &'a Host> + 'a {
        self.hosts.values().filter(move |h| h.as_id == as_id)
    }

    fn sole_host(&self, as_id: &str) -> RepoResult<Host> {
        if !self.ases.contains_key(as_id) {
            return Err(RepoError::not_found("AS", as_id));
        }
        let mut hosts = self.hosts_of(as_id);
        match (hosts.next(), hosts.next()) {
            (Some(host), None) => Ok(host.clone()),
            (None, _) => Err(RepoError::not_found("host of AS", as_id)),
            (Some(_), Some(_)) => Err(RepoError::MultipleFound {
                entity: "host",
                key: format!("AS {}", as_id),
            }),
        }
    }

    fn update_trust_material(&mut self, isd_id: IsdId) -> RepoResult<Isd> {
        let isd = self
            .isds
            .get_mut(&isd_id)
            .ok_or_else(|| RepoError::not_found("ISD", isd_id))?;
        isd.trc_version += 1;
        let isd = isd.clone();

        let mut has_core = false;
        for as_ in self.ases.values_mut().filter(|a| a.isd_id == isd_id) {
            as_.certificate_version += 1;
            has_core |= as_.is_core;
        }
        if !has_core {
            warn!("ISD {} has no core AS; TRC {} has no voting members", isd_id, isd.trc_version);
        }
        debug!("Updated trust material of ISD {} to TRC version {}", isd_id, isd.trc_version);
        Ok(isd)
    }

    /// Interface id that the `nth` (0-based) next allocation on `as_id` would get.
    fn peek_interface_id(&self, as_id: &str, nth: u16) -> RepoResult<u16> {
        let used = self.next_interface_id.get(as_id).copied().unwrap_or(0);
        used.checked_add(nth + 1)
            .filter(|id| *id <= MAX_INTERFACE_ID)
            .ok_or_else(|| RepoError::exhausted("interface id", format!("AS {}", as_id)))
    }

    fn new_interface(&mut self, as_id: &str) -> RepoResult<Interface> {
        let host = self.sole_host(as_id)?;
        let interface_id = self.peek_interface_id(as_id, 0)?;
        let public_port = INTERFACE_PORT_BASE
            .checked_add(interface_id)
            .ok_or_else(|| RepoError::exhausted("interface port", format!("AS {}", as_id)))?;
        self.next_interface_id.insert(as_id.to_string(), interface_id);
        Ok(Interface {
            as_id: as_id.to_string(),
            host_id: host.id,
            interface_id,
            public_port,
        })
    }
}

/// Complete dump of a repository's contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub isds: Vec<Isd>,
    pub ases: Vec<As>,
    pub hosts: Vec<Host>,
    pub services: Vec<Service>,
    pub links: Vec<Link>,
    pub attachment_points: Vec<AttachmentPoint>,
    pub vpns: Vec<Vpn>,
}

/// Thread-safe repository keeping every entity in memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out every entity
    pub fn snapshot(&self) -> TopologySnapshot {
        let store = self.store.read();
        let mut ases: Vec<As> = store.ases.values().cloned().collect();
        ases.sort_by_key(|a| a.created.seq);
        let mut attachment_points: Vec<AttachmentPoint> =
            store.attachment_points.values().cloned().collect();
        attachment_points.sort_by_key(|ap| ap.created.seq);

        TopologySnapshot {
            isds: store.isds.values().cloned().collect(),
            ases,
            hosts: store.hosts.values().cloned().collect(),
            services: store.services.values().cloned().collect(),
            links: store.links.values().cloned().collect(),
            attachment_points,
            vpns: store.vpns.values().cloned().collect(),
        }
    }
}

impl EntityRepository for InMemoryRepository {
    fn create_isd(&self, isd_id: IsdId, label: &str) -> RepoResult<Isd> {
        let mut store = self.store.write();
        if store.isds.contains_key(&isd_id) {
            return Err(RepoError::duplicate("ISD", isd_id));
        }
        let isd = Isd {
            isd_id,
            label: label.to_string(),
            trc_version: 0,
            created: store.stamp(),
        };
        store.isds.insert(isd_id, isd.clone());
        debug!("Created ISD {} ({})", isd_id, label);
        Ok(isd)
    }

    fn get_isd(&self, isd_id: IsdId) -> RepoResult<Isd> {
        self.store
            .read()
            .isds
            .get(&isd_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("ISD", isd_id))
    }

    fn list_isds(&self) -> Vec<Isd> {
        self.store.read().isds.values().cloned().collect()
    }

    fn create_as_with_defaults(&self, new_as: NewAs) -> RepoResult<As> {
        let mut store = self.store.write();
        if !store.isds.contains_key(&new_as.isd_id) {
            return Err(RepoError::not_found("ISD", new_as.isd_id));
        }
        if store.ases.contains_key(&new_as.as_id) {
            return Err(RepoError::duplicate("AS", &new_as.as_id));
        }

        let as_ = As {
            as_id: new_as.as_id.clone(),
            isd_id: new_as.isd_id,
            label: new_as.label,
            public_ip: new_as.public_ip.clone(),
            is_core: new_as.is_core,
            owner: new_as.owner.clone(),
            trust_deferred: new_as.defer_trust_init,
            certificate_version: 0,
            created: store.stamp(),
        };
        store.ases.insert(as_.as_id.clone(), as_.clone());

        let host = Host {
            id: store.allocate_id(),
            as_id: as_.as_id.clone(),
            owner: new_as.owner,
            public_ip: new_as.public_ip,
            label: None,
            created: store.stamp(),
        };
        let host_id = host.id;
        store.hosts.insert(host_id, host);

        for service_type in ServiceType::DEFAULTS {
            let service = Service {
                id: store.allocate_id(),
                host_id,
                as_id: as_.as_id.clone(),
                service_type,
                created: store.stamp(),
            };
            store.services.insert(service.id, service);
        }
        debug!(
            "Created AS {} in ISD {} with host {} and {} default services",
            as_.as_id,
            as_.isd_id,
            host_id,
            ServiceType::DEFAULTS.len()
        );

        if !new_as.defer_trust_init {
            store.update_trust_material(as_.isd_id)?;
            return store
                .ases
                .get(&as_.as_id)
                .cloned()
                .ok_or_else(|| RepoError::not_found("AS", &as_.as_id));
        }
        Ok(as_)
    }

    fn get_as(&self, as_id: &str) -> RepoResult<As> {
        self.store
            .read()
            .ases
            .get(as_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("AS", as_id))
    }

    fn list_ases(&self) -> Vec<As> {
        let mut ases: Vec<As> = self.store.read().ases.values().cloned().collect();
        ases.sort_by_key(|a| a.created.seq);
        ases
    }

    fn update_trust_material(&self, isd_id: IsdId) -> RepoResult<Isd> {
        self.store.write().update_trust_material(isd_id)
    }

    fn create_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint> {
        let mut store = self.store.write();
        if !store.ases.contains_key(as_id) {
            return Err(RepoError::not_found("AS", as_id));
        }
        if store.attachment_points.contains_key(as_id) {
            return Err(RepoError::duplicate("attachment point", as_id));
        }
        let ap = AttachmentPoint {
            as_id: as_id.to_string(),
            vpn_id: None,
            created: store.stamp(),
        };
        store.attachment_points.insert(as_id.to_string(), ap.clone());
        debug!("Created attachment point on AS {}", as_id);
        Ok(ap)
    }

    fn get_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint> {
        self.store
            .read()
            .attachment_points
            .get(as_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("attachment point", as_id))
    }

    fn save_attachment_point(&self, attachment_point: &AttachmentPoint) -> RepoResult<AttachmentPoint> {
        let mut store = self.store.write();
        if let Some(vpn_id) = attachment_point.vpn_id {
            if !store.vpns.contains_key(&vpn_id) {
                return Err(RepoError::not_found("VPN", vpn_id));
            }
        }
        let stored = store
            .attachment_points
            .get_mut(&attachment_point.as_id)
            .ok_or_else(|| RepoError::not_found("attachment point", &attachment_point.as_id))?;
        stored.vpn_id = attachment_point.vpn_id;
        Ok(stored.clone())
    }

    fn list_attachment_points(&self) -> Vec<AttachmentPoint> {
        let mut aps: Vec<AttachmentPoint> =
            self.store.read().attachment_points.values().cloned().collect();
        aps.sort_by_key(|ap| ap.created.seq);
        aps
    }

    fn create_link(&self, link_type: LinkType, as_id_a: &str, as_id_b: &str) -> RepoResult<Link> {
        let mut store = self.store.write();
        for as_id in [as_id_a, as_id_b] {
            if !store.ases.contains_key(as_id) {
                return Err(RepoError::not_found("AS", as_id));
            }
        }
        // Resolve both hosts and ids before allocating so a failure leaves no interface behind.
        store.sole_host(as_id_a)?;
        store.sole_host(as_id_b)?;
        store.peek_interface_id(as_id_a, 0)?;
        store.peek_interface_id(as_id_b, u16::from(as_id_a == as_id_b))?;

        let interface_a = store.new_interface(as_id_a)?;
        let interface_b = store.new_interface(as_id_b)?;
        let link = Link {
            id: store.allocate_id(),
            link_type,
            interface_a,
            interface_b,
            created: store.stamp(),
        };
        store.links.insert(link.id, link.clone());
        debug!("Created {} link {} -> {}", link_type, as_id_a, as_id_b);
        Ok(link)
    }

    fn list_links(&self) -> Vec<Link> {
        self.store.read().links.values().cloned().collect()
    }

    fn get_sole_host(&self, as_id: &str) -> RepoResult<Host> {
        self.store.read().sole_host(as_id)
    }

    fn list_hosts(&self, filter: HostFilter) -> Vec<Host> {
        self.store
            .read()
            .hosts
            .values()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect()
    }

    fn save_host(&self, host: &Host) -> RepoResult<Host> {
        let mut store = self.store.write();
        let stored = store
            .hosts
            .get_mut(&host.id)
            .ok_or_else(|| RepoError::not_found("host", host.id))?;
        stored.label = host.label.clone();
        stored.public_ip = host.public_ip.clone();
        Ok(stored.clone())
    }

    fn create_vpn(
        &self,
        server_host_id: EntityId,
        server_vpn_ip: &str,
        server_port: u16,
        subnet: &str,
    ) -> RepoResult<Vpn> {
        let mut store = self.store.write();
        if !store.hosts.contains_key(&server_host_id) {
            return Err(RepoError::not_found("host", server_host_id));
        }
        let vpn = Vpn {
            id: store.allocate_id(),
            server_host_id,
            server_vpn_ip: server_vpn_ip.to_string(),
            server_port,
            subnet: subnet.to_string(),
            created: store.stamp(),
        };
        store.vpns.insert(vpn.id, vpn.clone());
        debug!("Created VPN {} on host {} ({})", vpn.id, server_host_id, subnet);
        Ok(vpn)
    }

    fn list_vpns(&self) -> Vec<Vpn> {
        self.store.read().vpns.values().cloned().collect()
    }

    fn create_service(
        &self,
        host_id: EntityId,
        as_id: &str,
        service_type: ServiceType,
    ) -> RepoResult<Service> {
        let mut store = self.store.write();
        if !store.ases.contains_key(as_id) {
            return Err(RepoError::not_found("AS", as_id));
        }
        match store.hosts.get(&host_id) {
            Some(host) if host.as_id == as_id => {}
            _ => return Err(RepoError::not_found("host", format!("{} in AS {}", host_id, as_id))),
        }
        let service = Service {
            id: store.allocate_id(),
            host_id,
            as_id: as_id.to_string(),
            service_type,
            created: store.stamp(),
        };
        store.services.insert(service.id, service.clone());
        debug!("Created {} service on host {} of AS {}", service_type, host_id, as_id);
        Ok(service)
    }

    fn list_services(&self, as_id: &str) -> Vec<Service> {
        self.store
            .read()
            .services
            .values()
            .filter(|s| s.as_id == as_id)
            .cloned()
            .collect()
    }
}
