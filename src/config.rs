//! Declarative topology description.
//!
//! A [`TopologySpec`] lists the ISDs, ASes, links, VPNs and extra services
//! that the builder should create. Nothing is checked when a spec is put
//! together; dangling references only surface when the builder runs it
//! against a repository.

use crate::model::{AsId, IsdId, LinkType, ServiceType};
use crate::utils::as_id::expand_as_id;

/// Desired isolation domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsdSpec {
    pub isd_id: IsdId,
    pub label: String,
}

/// Desired AS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsSpec {
    pub isd_id: IsdId,
    pub as_id: AsId,
    pub label: String,
    pub public_ip: String,
    pub is_core: bool,
    pub is_attachment_point: bool,
}

/// Desired link. For [`LinkType::Provider`], `as_id_a` is the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub link_type: LinkType,
    pub as_id_a: AsId,
    pub as_id_b: AsId,
}

/// Desired VPN server on an attachment point AS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnSpec {
    pub as_id: AsId,
    pub vpn_ip: String,
    pub vpn_port: u16,
    pub subnet: String,
}

/// Service to add on top of the defaults of an AS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraServiceSpec {
    pub as_id: AsId,
    pub service_type: ServiceType,
}

/// Complete description of a topology, processed in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySpec {
    pub isds: Vec<IsdSpec>,
    pub ases: Vec<AsSpec>,
    pub links: Vec<LinkSpec>,
    pub vpns: Vec<VpnSpec>,
    pub extra_services: Vec<ExtraServiceSpec>,
}

impl IsdSpec {
    pub fn new(isd_id: IsdId, label: &str) -> Self {
        Self {
            isd_id,
            label: label.to_string(),
        }
    }
}

/// Build an [`AsSpec`] from the numeric tail of its identifier.
pub fn make_as_spec(
    isd_id: IsdId,
    as_id_tail: u64,
    label: &str,
    public_ip: &str,
    is_core: bool,
    is_attachment_point: bool,
) -> AsSpec {
    AsSpec {
        isd_id,
        as_id: expand_as_id(as_id_tail),
        label: label.to_string(),
        public_ip: public_ip.to_string(),
        is_core,
        is_attachment_point,
    }
}

/// Build a [`LinkSpec`] between the ASes with the given tails.
pub fn make_link_spec(link_type: LinkType, as_id_tail_a: u64, as_id_tail_b: u64) -> LinkSpec {
    LinkSpec {
        link_type,
        as_id_a: expand_as_id(as_id_tail_a),
        as_id_b: expand_as_id(as_id_tail_b),
    }
}

pub fn make_vpn_spec(as_id_tail: u64, vpn_ip: &str, vpn_port: u16, subnet: &str) -> VpnSpec {
    VpnSpec {
        as_id: expand_as_id(as_id_tail),
        vpn_ip: vpn_ip.to_string(),
        vpn_port,
        subnet: subnet.to_string(),
    }
}

pub fn make_extra_service_spec(as_id_tail: u64, service_type: ServiceType) -> ExtraServiceSpec {
    ExtraServiceSpec {
        as_id: expand_as_id(as_id_tail),
        service_type,
    }
}

impl TopologySpec {
    /// The stock test topology: one ISD with a core attachment point AS
    /// providing for two leaf ASes, plus a SIG on the core AS.
    pub fn testtopo() -> Self {
        Self {
            isds: vec![IsdSpec::new(16, "Tsinghua")],
            ases: vec![
                make_as_spec(16, 0x1101, "vm-1", "240a:a066:100:1::11", true, true),
                make_as_spec(16, 0x1102, "vm-2", "240a:a066:100:1::12", false, false),
                make_as_spec(16, 0x1103, "vm-3", "240a:a066:100:1::13", false, false),
            ],
            links: vec![
                make_link_spec(LinkType::Provider, 0x1101, 0x1102),
                make_link_spec(LinkType::Provider, 0x1101, 0x1103),
            ],
            vpns: Vec::new(),
            extra_services: vec![make_extra_service_spec(0x1101, ServiceType::IpGateway)],
        }
    }

    /// Look up a named built-in topology.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "testtopo" => Some(Self::testtopo()),
            _ => None,
        }
    }

    /// Number of entries across all sections
    pub fn len(&self) -> usize {
        self.isds.len() + self.ases.len() + self.links.len() + self.vpns.len() + self.extra_services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
