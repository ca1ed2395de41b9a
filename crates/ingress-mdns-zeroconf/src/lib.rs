// # mDNS Advertiser
//
// This crate provides an Advertiser backed by the `mdns-sd` responder.
//
// ## Implementation
//
// - One `ServiceDaemon` per advertiser, bound to exactly one interface
// - Each registration is a `_http._tcp` service instance whose target host
//   is `<hostname>.local.` and resolves to the Ingress load-balancer IP
// - Unregistering waits until the responder has sent its goodbye packets
//
// ## Threading
//
// The daemon runs its own thread and is driven over a channel, so
// `register` never blocks. `unregister` and `shutdown` wait on the daemon's
// reply channel from the blocking pool.

pub mod interface;

pub use interface::{NetworkInterface, find_interface};

use async_trait::async_trait;
use ingress_mdns_core::traits::{Advertiser, Registration, RegistrationHandle};
use ingress_mdns_core::{Error, Result};
use mdns_sd::{IfKind, ServiceDaemon, ServiceInfo, UnregisterStatus};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Advertiser over the `mdns-sd` responder
pub struct MdnsSdAdvertiser {
    daemon: ServiceDaemon,

    /// The only interface the daemon announces on
    interface: String,
}

impl std::fmt::Debug for MdnsSdAdvertiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdnsSdAdvertiser")
            .field("interface", &self.interface)
            .finish()
    }
}

impl MdnsSdAdvertiser {
    /// Start a responder bound to `interface`
    ///
    /// # Errors
    ///
    /// Returns `Error::Advertiser` if the daemon cannot start or the
    /// interface cannot be selected.
    pub fn new(interface: impl Into<String>) -> Result<Self> {
        let interface = interface.into();

        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::advertiser(format!("Failed to create mDNS daemon: {e}")))?;

        daemon
            .disable_interface(IfKind::All)
            .map_err(|e| Error::advertiser(format!("Failed to disable interfaces: {e}")))?;
        daemon
            .enable_interface(IfKind::Name(interface.clone()))
            .map_err(|e| {
                Error::advertiser(format!("Failed to enable interface {interface}: {e}"))
            })?;

        info!("mDNS responder bound to {}", interface);

        Ok(Self { daemon, interface })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

#[async_trait]
impl Advertiser for MdnsSdAdvertiser {
    async fn register(&self, registration: &Registration) -> Result<RegistrationHandle> {
        if !registration.interfaces.is_empty() && !registration.interfaces.contains(&self.interface)
        {
            return Err(Error::advertiser(format!(
                "{} requested interfaces {:?}, responder is bound to {}",
                registration.instance, registration.interfaces, self.interface
            )));
        }

        let info = service_info(registration)?;
        let fullname = info.get_fullname().to_string();

        self.daemon
            .register(info)
            .map_err(|e| Error::advertiser(format!("Failed registering {fullname}: {e}")))?;

        debug!("Announcing {} on port {}", fullname, registration.port);
        Ok(RegistrationHandle::new(fullname))
    }

    async fn unregister(&self, handle: &RegistrationHandle) -> Result<()> {
        let fullname = handle.fullname().to_string();

        let receiver = self
            .daemon
            .unregister(&fullname)
            .map_err(|e| Error::advertiser(format!("Failed unregistering {fullname}: {e}")))?;

        // Resolves once the goodbye announcement went out
        let status = tokio::task::spawn_blocking(move || receiver.recv())
            .await
            .map_err(|e| Error::advertiser(format!("Unregister task failed: {e}")))?
            .map_err(|e| Error::advertiser(format!("mDNS daemon gone: {e}")))?;

        match status {
            UnregisterStatus::OK => debug!("Withdrew {}", fullname),
            UnregisterStatus::NotFound => warn!("{} was not registered with the responder", fullname),
        }

        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let receiver = self
            .daemon
            .shutdown()
            .map_err(|e| Error::advertiser(format!("Failed to stop mDNS daemon: {e}")))?;

        let status = tokio::task::spawn_blocking(move || receiver.recv())
            .await
            .map_err(|e| Error::advertiser(format!("Shutdown task failed: {e}")))?;

        match status {
            Ok(status) => debug!("mDNS daemon stopped: {:?}", status),
            // The daemon thread exits before replying when it is already stopping
            Err(e) => debug!("mDNS daemon stopped without status: {}", e),
        }

        info!("mDNS responder on {} stopped", self.interface);
        Ok(())
    }

    fn advertiser_name(&self) -> &'static str {
        "mdns-sd"
    }
}

/// Build the responder's service record for a registration
///
/// # Errors
///
/// Returns `Error::Advertiser` when the registration carries no address or
/// the names are not valid DNS labels.
pub fn service_info(registration: &Registration) -> Result<ServiceInfo> {
    if registration.addresses.is_empty() {
        return Err(Error::advertiser(format!(
            "No address to advertise for {}",
            registration.instance
        )));
    }

    let addresses = registration
        .addresses
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let properties: HashMap<String, String> = registration
        .txt_records
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ServiceInfo::new(
        &registration.service_type_domain(),
        &registration.instance,
        &registration.host,
        addresses.as_str(),
        registration.port,
        properties,
    )
    .map_err(|e| {
        Error::advertiser(format!(
            "Invalid service record for {}: {e}",
            registration.instance
        ))
    })
}
