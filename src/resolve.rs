use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use tracing::instrument;

/// Resolve a hostname or `IPv4` literal to a single `IPv4` address.
///
/// The first `IPv4` address returned by the system resolver is used.
#[instrument(level = "debug")]
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr> {
    if host.is_empty() {
        return Err(Error::Resolve(String::from("empty address")));
    }
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    let addrs = dns_lookup::lookup_host(host)
        .map_err(|err| Error::Resolve(format!("lookup {host}: {err}")))?;
    let addr = first_ipv4(&addrs)
        .ok_or_else(|| Error::Resolve(format!("lookup {host}: no IPv4 address found")))?;
    tracing::debug!(%addr, candidates = addrs.len(), "resolved");
    Ok(addr)
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|addr| match addr {
        IpAddr::V4(addr) => Some(*addr),
        IpAddr::V6(_) => None,
    })
}
