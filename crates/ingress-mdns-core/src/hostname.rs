//! Local hostname extraction
//!
//! Turns an Ingress object into the set of hostnames it asks to have
//! advertised on the local network, plus the address they should resolve to.
//!
//! Extraction is pure: the same Ingress always yields the same
//! [`IngressSnapshot`], and nothing here touches the network.

use k8s_openapi::api::networking::v1::Ingress;
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

/// Port advertised for hostnames on an Ingress with TLS configured
pub const HTTPS_PORT: u16 = 443;

/// Port advertised for plain HTTP hostnames
pub const HTTP_PORT: u16 = 80;

/// Identity of one advertised hostname
///
/// Two values differing only in `tls` are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalHostname {
    /// Bare hostname with the local suffix stripped (e.g. "foo")
    pub hostname: String,
    /// Whether the owning Ingress declares TLS
    pub tls: bool,
}

impl LocalHostname {
    pub fn new(hostname: impl Into<String>, tls: bool) -> Self {
        Self {
            hostname: hostname.into(),
            tls,
        }
    }

    /// Port the service is advertised on
    ///
    /// Backends are assumed to listen on the standard HTTP(S) ports.
    pub fn port(&self) -> u16 {
        if self.tls { HTTPS_PORT } else { HTTP_PORT }
    }
}

impl fmt::Display for LocalHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tls {
            write!(f, "{} (tls)", self.hostname)
        } else {
            f.write_str(&self.hostname)
        }
    }
}

/// Hostnames and address derived from one observation of an Ingress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngressSnapshot {
    /// Local hostnames in rule order, without repeats
    pub hostnames: Vec<LocalHostname>,
    /// First load-balancer IP, if the Ingress has one
    pub ip: Option<IpAddr>,
}

impl IngressSnapshot {
    /// Hostnames as an unordered set
    pub fn hostname_set(&self) -> HashSet<&LocalHostname> {
        self.hostnames.iter().collect()
    }

    /// Whether both snapshots name the same hostnames, ignoring order
    pub fn same_hostnames(&self, other: &IngressSnapshot) -> bool {
        self.hostname_set() == other.hostname_set()
    }
}

/// Extract local hostnames and the load-balancer IP from an Ingress
///
/// - The TLS flag is true iff `spec.tls` is non-empty, and applies to every
///   hostname of the Ingress. Mixed TLS and cleartext hosts on one Ingress
///   are not distinguished.
/// - Only rule hosts ending in `suffix` are kept, with the suffix stripped.
/// - The IP comes from the first `status.loadBalancer.ingress` entry. Missing
///   or unparsable status yields `None`; the advertiser reports the failure.
pub fn extract(ingress: &Ingress, suffix: &str) -> IngressSnapshot {
    let spec = ingress.spec.as_ref();

    let tls = spec
        .and_then(|spec| spec.tls.as_ref())
        .is_some_and(|tls| !tls.is_empty());

    let mut hostnames: Vec<LocalHostname> = Vec::new();
    let rules = spec.and_then(|spec| spec.rules.as_deref()).unwrap_or_default();
    for host in rules.iter().filter_map(|rule| rule.host.as_deref()) {
        let Some(bare) = host.strip_suffix(suffix) else {
            continue;
        };
        if bare.is_empty() {
            continue;
        }
        let local = LocalHostname::new(bare, tls);
        if !hostnames.contains(&local) {
            hostnames.push(local);
        }
    }

    IngressSnapshot {
        hostnames,
        ip: load_balancer_ip(ingress),
    }
}

fn load_balancer_ip(ingress: &Ingress) -> Option<IpAddr> {
    ingress
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .first()?
        .ip
        .as_deref()?
        .parse()
        .ok()
}
