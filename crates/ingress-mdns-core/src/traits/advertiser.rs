// # Advertiser Trait
//
// Defines the interface for announcing services over mDNS.
//
// ## Implementations
//
// - mdns-sd responder: `ingress-mdns-zeroconf` crate
//
// ## Usage
//
// ```rust,ignore
// use ingress_mdns_core::{Advertiser, LocalHostname, Registration};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let advertiser = /* Advertiser implementation */;
//
//     let key = LocalHostname::new("grafana", true);
//     let registration = Registration::for_hostname(&key, Some([10, 0, 0, 7].into()), &config.advertise);
//     let handle = advertiser.register(&registration).await?;
//
//     advertiser.unregister(&handle).await?;
//     Ok(())
// }
// ```

use crate::config::AdvertiseConfig;
use crate::hostname::LocalHostname;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Everything needed to announce one hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Service instance name (the bare hostname)
    pub instance: String,
    /// DNS-SD service type without domain (e.g. "_http._tcp")
    pub service_type: String,
    /// mDNS domain without dots (e.g. "local")
    pub domain: String,
    /// Advertised port
    pub port: u16,
    /// Target host, fully qualified (e.g. "foo.local.")
    pub host: String,
    /// Addresses the target host resolves to
    pub addresses: Vec<IpAddr>,
    /// TXT records
    pub txt_records: BTreeMap<String, String>,
    /// Interfaces to announce on
    pub interfaces: Vec<String>,
}

impl Registration {
    /// Build the registration for a local hostname
    ///
    /// A missing IP produces a registration with no addresses. Advertisers
    /// reject it, which surfaces as a per-hostname registration failure.
    pub fn for_hostname(key: &LocalHostname, ip: Option<IpAddr>, config: &AdvertiseConfig) -> Self {
        Self {
            instance: key.hostname.clone(),
            service_type: config.service_type.clone(),
            domain: config.domain.clone(),
            port: key.port(),
            host: format!("{}.{}.", key.hostname, config.domain),
            addresses: ip.into_iter().collect(),
            txt_records: config.txt_records.clone(),
            interfaces: vec![config.interface.clone()],
        }
    }

    /// Fully qualified service type, e.g. `_http._tcp.local.`
    pub fn service_type_domain(&self) -> String {
        format!("{}.{}.", self.service_type, self.domain)
    }

    /// Full service instance name, e.g. `foo._http._tcp.local.`
    pub fn fullname(&self) -> String {
        format!("{}.{}", self.instance, self.service_type_domain())
    }
}

/// Opaque handle to an active registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationHandle(String);

impl RegistrationHandle {
    pub fn new(fullname: impl Into<String>) -> Self {
        Self(fullname.into())
    }

    /// Full service instance name this handle refers to
    pub fn fullname(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for mDNS advertiser implementations
///
/// # Contract
///
/// - `register` makes one attempt. Retries are not the advertiser's concern;
///   a failure is reported and the engine moves on.
/// - `unregister` is only called with handles returned by `register` that
///   have not been unregistered yet.
/// - `shutdown` releases sockets. No calls follow it.
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
#[async_trait]
pub trait Advertiser: Send + Sync {
    /// Announce a service
    ///
    /// # Returns
    ///
    /// - `Ok(RegistrationHandle)`: The service is being announced
    /// - `Err(Error)`: Nothing was announced (no address, conflict, interface down)
    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<RegistrationHandle, crate::Error>;

    /// Withdraw a previously announced service
    async fn unregister(&self, handle: &RegistrationHandle) -> Result<(), crate::Error>;

    /// Release network resources
    async fn shutdown(&self) -> Result<(), crate::Error> {
        Ok(())
    }

    /// Get the advertiser name (for logging/debugging)
    fn advertiser_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_for_hostname() {
        let config = AdvertiseConfig::new("eth0");
        let key = LocalHostname::new("grafana", true);
        let registration = Registration::for_hostname(&key, Some(IpAddr::from([10, 0, 0, 7])), &config);

        assert_eq!(registration.instance, "grafana");
        assert_eq!(registration.port, 443);
        assert_eq!(registration.host, "grafana.local.");
        assert_eq!(registration.addresses, vec![IpAddr::from([10, 0, 0, 7])]);
        assert_eq!(registration.interfaces, vec!["eth0".to_string()]);
        assert_eq!(registration.fullname(), "grafana._http._tcp.local.");
    }

    #[test]
    fn test_registration_without_ip() {
        let config = AdvertiseConfig::new("eth0");
        let key = LocalHostname::new("plain", false);
        let registration = Registration::for_hostname(&key, None, &config);

        assert_eq!(registration.port, 80);
        assert!(registration.addresses.is_empty());
    }
}
