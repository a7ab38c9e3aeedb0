//! Topology file validation utilities.
//!
//! These checks are purely syntactic: addresses parse, ports and labels are
//! sane. Whether an AS or ISD referenced by an entry actually exists is left
//! to the builder, which sees the repository.

use crate::config::{AsSpec, IsdSpec, TopologySpec, VpnSpec};
use std::net::IpAddr;

/// Validate a whole topology.
///
/// Checks for:
/// - Empty ISD or AS labels
/// - Unparsable AS public IPs and VPN server IPs
/// - VPN subnets not in `address/prefix` form, or not containing the server IP's family
/// - VPN port 0
///
/// An ISD or AS listed twice passes; the builder reports it as a duplicate key.
///
/// # Examples
/// ```
/// use sciontopo::config::TopologySpec;
/// use sciontopo::utils::validation::validate_topology_spec;
///
/// assert!(validate_topology_spec(&TopologySpec::testtopo()).is_ok());
/// ```
pub fn validate_topology_spec(spec: &TopologySpec) -> Result<(), String> {
    for isd in &spec.isds {
        validate_isd_spec(isd)?;
    }

    for as_spec in &spec.ases {
        validate_as_spec(as_spec)?;
    }

    for vpn in &spec.vpns {
        validate_vpn_spec(vpn)?;
    }

    Ok(())
}

pub fn validate_isd_spec(isd: &IsdSpec) -> Result<(), String> {
    if isd.label.trim().is_empty() {
        return Err(format!("ISD {} has an empty label", isd.isd_id));
    }
    Ok(())
}

pub fn validate_as_spec(as_spec: &AsSpec) -> Result<(), String> {
    if as_spec.label.trim().is_empty() {
        return Err(format!("AS {} has an empty label", as_spec.as_id));
    }
    if as_spec.public_ip.parse::<IpAddr>().is_err() {
        return Err(format!(
            "AS {} has an invalid public IP '{}'",
            as_spec.as_id, as_spec.public_ip
        ));
    }
    Ok(())
}

pub fn validate_vpn_spec(vpn: &VpnSpec) -> Result<(), String> {
    let server_ip = vpn
        .vpn_ip
        .parse::<IpAddr>()
        .map_err(|_| format!("VPN on AS {} has an invalid server IP '{}'", vpn.as_id, vpn.vpn_ip))?;

    if vpn.vpn_port == 0 {
        return Err(format!("VPN on AS {} uses port 0", vpn.as_id));
    }

    let (network, prefix) = parse_subnet(&vpn.subnet)
        .ok_or_else(|| format!("VPN on AS {} has an invalid subnet '{}'", vpn.as_id, vpn.subnet))?;
    if network.is_ipv4() != server_ip.is_ipv4() {
        return Err(format!(
            "VPN on AS {}: server IP {} and subnet {} are different address families",
            vpn.as_id, vpn.vpn_ip, vpn.subnet
        ));
    }
    log::debug!("VPN subnet {}/{} on AS {} validated", network, prefix, vpn.as_id);

    Ok(())
}

/// Parse `address/prefix`, checking the prefix length against the address family.
pub fn parse_subnet(subnet: &str) -> Option<(IpAddr, u8)> {
    let (addr, prefix) = subnet.split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max_prefix {
        return None;
    }
    Some((addr, prefix))
}
