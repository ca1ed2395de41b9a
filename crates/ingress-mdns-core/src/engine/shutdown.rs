//! Shutdown coordination
//!
//! On termination every hostname still in the store is withdrawn, so peers
//! stop resolving names whose Ingress outlives this process.

use crate::error::Result;
use crate::hostname::LocalHostname;
use crate::state::RecordStore;
use crate::traits::Advertiser;
use tracing::{debug, error, info};

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Outcome of a full-store unregistration
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Hostnames withdrawn successfully
    pub unregistered: Vec<LocalHostname>,
    /// Hostnames whose withdrawal failed, with the error
    pub failed: Vec<(LocalHostname, String)>,
}

impl ShutdownReport {
    /// Number of unregister calls made
    pub fn attempted(&self) -> usize {
        self.unregistered.len() + self.failed.len()
    }
}

/// Unregister every record in the store, in no particular order
///
/// Exactly one unregister call is made per record. Failures are logged and
/// do not stop the remaining withdrawals. The store is empty afterwards.
pub async fn unregister_all(store: &mut RecordStore, advertiser: &dyn Advertiser) -> ShutdownReport {
    let mut report = ShutdownReport::default();

    let keys = store.keys();
    debug!("Unregistering {} hostname(s) before exit", keys.len());

    for key in keys {
        let Some(record) = store.remove(&key) else {
            continue;
        };

        info!(
            "Unregistering {} after {}s",
            key.hostname,
            record.age().num_seconds()
        );
        match advertiser.unregister(&record.handle).await {
            Ok(()) => report.unregistered.push(key),
            Err(e) => {
                error!("Failed to unregister hostname {}: {}", key.hostname, e);
                report.failed.push((key, e.to_string()));
            }
        }
    }

    report
}

/// Termination signals the daemon reacts to (SIGTERM, SIGINT)
///
/// Handlers are installed eagerly so that a signal arriving before the
/// engine awaits it is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownSignal {
    /// Install the signal handlers
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Install the signal handlers
    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Wait for a signal, returning its name
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }

    /// Wait for Ctrl-C
    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Registration, RegistrationHandle};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAdvertiser {
        unregistered: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl Advertiser for RecordingAdvertiser {
        async fn register(&self, registration: &Registration) -> Result<RegistrationHandle> {
            Ok(RegistrationHandle::new(registration.fullname()))
        }

        async fn unregister(&self, handle: &RegistrationHandle) -> Result<()> {
            self.unregistered.lock().unwrap().push(handle.fullname().to_string());
            if self.fail_on == Some(handle.fullname()) {
                return Err(crate::Error::advertiser("responder gone"));
            }
            Ok(())
        }

        fn advertiser_name(&self) -> &'static str {
            "recording"
        }
    }

    fn store_with(names: &[&str]) -> RecordStore {
        let mut store = RecordStore::new();
        for name in names {
            store.put(
                LocalHostname::new(*name, false),
                RegistrationHandle::new(format!("{name}._http._tcp.local.")),
            );
        }
        store
    }

    #[tokio::test]
    async fn test_unregister_all_calls_once_per_record() {
        let mut store = store_with(&["a", "b", "c"]);
        let advertiser = RecordingAdvertiser::default();

        let report = unregister_all(&mut store, &advertiser).await;

        assert!(store.is_empty());
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.unregistered.len(), 3);
        assert_eq!(advertiser.unregistered.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unregister_all_continues_after_failure() {
        let mut store = store_with(&["a", "b"]);
        let advertiser = RecordingAdvertiser {
            fail_on: Some("a._http._tcp.local."),
            ..Default::default()
        };

        let report = unregister_all(&mut store, &advertiser).await;

        assert!(store.is_empty());
        assert_eq!(report.unregistered, vec![LocalHostname::new("b", false)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, LocalHostname::new("a", false));
    }

    #[tokio::test]
    async fn test_unregister_all_on_empty_store() {
        let mut store = RecordStore::new();
        let advertiser = RecordingAdvertiser::default();

        let report = unregister_all(&mut store, &advertiser).await;

        assert_eq!(report.attempted(), 0);
        assert!(advertiser.unregistered.lock().unwrap().is_empty());
    }
}
