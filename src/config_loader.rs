//! Topology file loading.
//!
//! Topology files are YAML. ASes may be referred to either by numeric tail
//! (`4353`, expanded to `ffaa:0:1101`) or by their full identifier.

use crate::config::{AsSpec, ExtraServiceSpec, IsdSpec, LinkSpec, TopologySpec, VpnSpec};
use crate::model::{IsdId, LinkType, ServiceType};
use crate::utils::as_id::expand_as_id;
use crate::utils::validation::validate_topology_spec;
use log::info;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Topology file loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to open topology file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse topology file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid topology: {0}")]
    Invalid(String),
}

/// AS reference as written in a topology file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AsReference {
    Tail(u64),
    Id(String),
}

impl AsReference {
    pub fn to_as_id(&self) -> String {
        match self {
            Self::Tail(tail) => expand_as_id(*tail),
            Self::Id(id) => id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IsdEntry {
    isd_id: IsdId,
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AsEntry {
    isd_id: IsdId,
    as_id: AsReference,
    label: String,
    public_ip: String,
    #[serde(default)]
    is_core: bool,
    #[serde(default)]
    is_attachment_point: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkEntry {
    #[serde(rename = "type")]
    link_type: LinkType,
    as_a: AsReference,
    as_b: AsReference,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VpnEntry {
    as_id: AsReference,
    vpn_ip: String,
    vpn_port: u16,
    subnet: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtraServiceEntry {
    as_id: AsReference,
    service_type: ServiceType,
}

/// On-disk layout of a topology file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyFile {
    #[serde(default)]
    isds: Vec<IsdEntry>,
    #[serde(default)]
    ases: Vec<AsEntry>,
    #[serde(default)]
    links: Vec<LinkEntry>,
    #[serde(default)]
    vpns: Vec<VpnEntry>,
    #[serde(default)]
    extra_services: Vec<ExtraServiceEntry>,
}

impl From<TopologyFile> for TopologySpec {
    fn from(file: TopologyFile) -> Self {
        TopologySpec {
            isds: file
                .isds
                .into_iter()
                .map(|i| IsdSpec {
                    isd_id: i.isd_id,
                    label: i.label,
                })
                .collect(),
            ases: file
                .ases
                .into_iter()
                .map(|a| AsSpec {
                    isd_id: a.isd_id,
                    as_id: a.as_id.to_as_id(),
                    label: a.label,
                    public_ip: a.public_ip,
                    is_core: a.is_core,
                    is_attachment_point: a.is_attachment_point,
                })
                .collect(),
            links: file
                .links
                .into_iter()
                .map(|l| LinkSpec {
                    link_type: l.link_type,
                    as_id_a: l.as_a.to_as_id(),
                    as_id_b: l.as_b.to_as_id(),
                })
                .collect(),
            vpns: file
                .vpns
                .into_iter()
                .map(|v| VpnSpec {
                    as_id: v.as_id.to_as_id(),
                    vpn_ip: v.vpn_ip,
                    vpn_port: v.vpn_port,
                    subnet: v.subnet,
                })
                .collect(),
            extra_services: file
                .extra_services
                .into_iter()
                .map(|s| ExtraServiceSpec {
                    as_id: s.as_id.to_as_id(),
                    service_type: s.service_type,
                })
                .collect(),
        }
    }
}

/// Parse and validate a topology from YAML text.
pub fn parse_topology(yaml: &str) -> Result<TopologySpec, ConfigError> {
    let file: TopologyFile = serde_yaml::from_str(yaml)?;
    let spec = TopologySpec::from(file);
    validate_topology_spec(&spec).map_err(ConfigError::Invalid)?;
    Ok(spec)
}

/// Load and validate a topology from a YAML file.
pub fn load_topology(path: &Path) -> Result<TopologySpec, ConfigError> {
    info!("Loading topology from: {:?}", path);
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: TopologyFile = serde_yaml::from_reader(file)?;
    let spec = TopologySpec::from(file);
    validate_topology_spec(&spec).map_err(ConfigError::Invalid)?;
    info!("Loaded topology with {} entries", spec.len());
    Ok(spec)
}
