// Network interface lookup
//
// The daemon advertises on exactly one interface, named in configuration.
// The name is checked against the host's interfaces before the responder
// starts so a typo is a configuration error instead of a silent no-op.

use ingress_mdns_core::{Error, Result};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A host interface and the addresses bound to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// Look up an interface by exact name
///
/// # Errors
///
/// - `Error::Network` if the interfaces cannot be enumerated
/// - `Error::NotFound` naming every available interface if none matches
pub fn find_interface(name: &str) -> Result<NetworkInterface> {
    let interfaces = if_addrs::get_if_addrs()?;
    let pairs = interfaces
        .into_iter()
        .map(|iface| {
            let ip = iface.ip();
            (iface.name, ip)
        })
        .collect::<Vec<_>>();

    select_interface(name, pairs)
}

fn select_interface(name: &str, pairs: Vec<(String, IpAddr)>) -> Result<NetworkInterface> {
    let mut addresses = Vec::new();
    let mut available = BTreeSet::new();

    for (iface, ip) in pairs {
        if iface == name {
            addresses.push(ip);
        }
        available.insert(iface);
    }

    if addresses.is_empty() {
        let available = available.into_iter().collect::<Vec<_>>().join(", ");
        return Err(Error::not_found(format!(
            "network interface '{}' (available: {})",
            name, available
        )));
    }

    Ok(NetworkInterface {
        name: name.to_string(),
        addresses,
    })
}
