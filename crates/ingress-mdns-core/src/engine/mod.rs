//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Consuming Ingress events from an IngressSource
//! - Extracting the local hostnames each Ingress asks for
//! - Diffing them against the RecordStore
//! - Registering/unregistering services via the Advertiser
//! - Unregistering everything on shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ IngressSource │─── IngressEvent ───┐
//! └───────────────┘                    │
//!                                      ▼
//!                            ┌──────────────────┐
//!                            │ ReconcileEngine  │
//!                            └──────────────────┘
//!                                      │
//!         ┌────────────────────────────┼───────────────────────────┐
//!         │                            │                           │
//!         ▼                            ▼                           ▼
//! ┌─────────────┐            ┌──────────────┐           ┌─────────────┐
//! │ RecordStore │            │  Advertiser  │           │   Events    │
//! │ (diff)      │            │ (announce)   │           │  (notify)   │
//! └─────────────┘            └──────────────┘           └─────────────┘
//! ```
//!
//! ## Event Handling
//!
//! | Event | Action |
//! |---|---|
//! | Added | register every extracted hostname not already in the store |
//! | Deleted | unregister every extracted hostname present in the store |
//! | Updated | no-op if the hostname sets match; otherwise unregister removed hostnames, then register added ones |
//!
//! A registration failure skips that hostname only. Registering a hostname
//! whose service name is held by the other TLS variant withdraws that
//! variant first.

pub mod shutdown;

use crate::config::MdnsConfig;
use crate::error::Result;
use crate::hostname::{self, IngressSnapshot, LocalHostname};
use crate::state::RecordStore;
use crate::traits::{Advertiser, IngressEvent, IngressSource, Registration};
use std::future::Future;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

pub use shutdown::{ShutdownReport, ShutdownSignal};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        source: &'static str,
        advertiser: &'static str,
    },

    /// A hostname is now advertised
    Registered {
        hostname: LocalHostname,
        fullname: String,
    },

    /// A hostname could not be advertised
    RegistrationFailed {
        hostname: LocalHostname,
        error: String,
    },

    /// A hostname is no longer advertised
    Unregistered { hostname: LocalHostname },

    /// Withdrawing a hostname failed; it was dropped from the store anyway
    UnregistrationFailed {
        hostname: LocalHostname,
        error: String,
    },

    /// Engine stopped after unregistering everything
    Stopped { reason: String, unregistered: usize },
}

/// Core reconciliation engine
///
/// Maps the live set of Ingress objects onto mDNS advertisements.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Start with [`ReconcileEngine::run()`]
/// 3. Engine runs until SIGINT/SIGTERM
/// 4. Every remaining registration is withdrawn before `run()` returns
///
/// ## Threading
///
/// The engine owns its [`RecordStore`] and handles one event at a time on the
/// task that drives `run()`. That serialization is the store's only
/// protection; there is no lock.
pub struct ReconcileEngine {
    /// Source of Ingress events
    source: Box<dyn IngressSource>,

    /// mDNS advertiser
    advertiser: Box<dyn Advertiser>,

    /// Active registrations
    store: RecordStore,

    /// Engine configuration
    config: MdnsConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new reconciliation engine
    ///
    /// # Parameters
    ///
    /// - `source`: Ingress source implementation
    /// - `advertiser`: mDNS advertiser implementation
    /// - `config`: Configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        source: Box<dyn IngressSource>,
        advertiser: Box<dyn Advertiser>,
        config: MdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            advertiser,
            store: RecordStore::new(),
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// Processes Ingress events until SIGINT or SIGTERM arrives, then
    /// unregisters every hostname still advertised.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Signal handlers could not be installed
    pub async fn run(&mut self) -> Result<()> {
        let signal = ShutdownSignal::install()?;

        self.run_until(async move {
            let name = signal.recv().await;
            info!("Received shutdown signal: {}", name);
        })
        .await
    }

    /// Run the engine until `shutdown` completes
    ///
    /// Once `shutdown` resolves, no further events are taken from the watch.
    /// An event already being handled finishes first; the watch stream is
    /// dropped, and only then are the remaining registrations withdrawn.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.emit_event(EngineEvent::Started {
            source: self.source.source_name(),
            advertiser: self.advertiser.advertiser_name(),
        });
        info!(
            "Watching ingresses via {}, advertising on {} via {}",
            self.source.source_name(),
            self.config.advertise.interface,
            self.advertiser.advertiser_name()
        );

        let mut stream = self.source.watch();
        let mut watching = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                next = stream.next(), if watching => match next {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!("Ingress watch ended; waiting for shutdown");
                        watching = false;
                    }
                },
            }
        }

        // Stop event delivery before tearing down registrations
        drop(stream);

        let report = self.shutdown().await;
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
            unregistered: report.unregistered.len(),
        });
        info!("Engine stopped");

        Ok(())
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// **TESTING ONLY**: production code should use `run()`, which manages
    /// shutdown via OS signals. `None` runs until the watch ends.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_until(async move {
                    let _ = rx.await;
                })
                .await
            }
            None => self.run_until(std::future::pending()).await,
        }
    }

    /// Handle a single Ingress event to completion
    pub async fn handle_event(&mut self, event: IngressEvent) {
        let object_key = event.object_key();
        debug!("Handling {:?} for ingress {}", event.kind(), object_key);

        match event {
            IngressEvent::Added(ingress) => {
                let snapshot = self.extract(&ingress);
                for key in &snapshot.hostnames {
                    if self.store.contains(key) {
                        debug!("{} already registered, skipping", key);
                        continue;
                    }
                    self.register_hostname(key, &snapshot).await;
                }
            }

            IngressEvent::Deleted(ingress) => {
                let snapshot = self.extract(&ingress);
                for key in &snapshot.hostnames {
                    self.unregister_hostname(key).await;
                }
            }

            IngressEvent::Updated { old, new } => {
                let old_snapshot = self.extract(&old);
                let new_snapshot = self.extract(&new);

                if old_snapshot.same_hostnames(&new_snapshot) {
                    debug!("Ingress {} hostnames unchanged", object_key);
                    return;
                }

                info!("Ingress {} changed, re-registering hostnames", object_key);

                let old_set = old_snapshot.hostname_set();
                let new_set = new_snapshot.hostname_set();
                let removed: Vec<LocalHostname> = old_snapshot
                    .hostnames
                    .iter()
                    .filter(|key| !new_set.contains(key))
                    .cloned()
                    .collect();
                let added: Vec<LocalHostname> = new_snapshot
                    .hostnames
                    .iter()
                    .filter(|key| !old_set.contains(key))
                    .cloned()
                    .collect();

                for key in &removed {
                    self.unregister_hostname(key).await;
                }
                for key in &added {
                    // Last writer wins over a registration made for another Ingress
                    self.unregister_hostname(key).await;
                    self.register_hostname(key, &new_snapshot).await;
                }
            }
        }
    }

    /// Unregister every hostname in the store
    ///
    /// Called by `run_until` after the watch has stopped; embedders driving
    /// [`handle_event`](Self::handle_event) themselves call it directly.
    /// Releases the advertiser's sockets afterwards.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let report = shutdown::unregister_all(&mut self.store, self.advertiser.as_ref()).await;

        for hostname in &report.unregistered {
            self.emit_event(EngineEvent::Unregistered {
                hostname: hostname.clone(),
            });
        }
        for (hostname, error) in &report.failed {
            self.emit_event(EngineEvent::UnregistrationFailed {
                hostname: hostname.clone(),
                error: error.clone(),
            });
        }

        if let Err(e) = self.advertiser.shutdown().await {
            error!("Failed to shut down {}: {}", self.advertiser.advertiser_name(), e);
        }

        report
    }

    /// Active registrations
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &MdnsConfig {
        &self.config
    }

    fn extract(&self, ingress: &k8s_openapi::api::networking::v1::Ingress) -> IngressSnapshot {
        hostname::extract(ingress, &self.config.advertise.local_suffix)
    }

    /// Register one hostname, storing the handle on success
    async fn register_hostname(&mut self, key: &LocalHostname, snapshot: &IngressSnapshot) {
        let registration = Registration::for_hostname(key, snapshot.ip, &self.config.advertise);

        // The responder keeps one service per full name; withdraw the key
        // holding it first so the store never outlives the announcement
        let fullname = registration.fullname();
        if let Some(alias) = self.store.owner_of(&fullname).filter(|owner| *owner != key).cloned() {
            info!("{} takes over {} from {}", key, fullname, alias);
            self.unregister_hostname(&alias).await;
        }

        info!("Registering {} on port {}", key.hostname, registration.port);

        match self.advertiser.register(&registration).await {
            Ok(handle) => {
                debug!("Registered {} as {}", key, handle);
                self.emit_event(EngineEvent::Registered {
                    hostname: key.clone(),
                    fullname: handle.fullname().to_string(),
                });
                for displaced in self.store.put(key.clone(), handle) {
                    debug!("Replaced stale record for {}", displaced.key);
                }
            }
            Err(e) => {
                error!("Failed to register hostname {}: {}", key.hostname, e);
                self.emit_event(EngineEvent::RegistrationFailed {
                    hostname: key.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Unregister one hostname if it is in the store
    async fn unregister_hostname(&mut self, key: &LocalHostname) {
        let Some(record) = self.store.remove(key) else {
            return;
        };

        info!(
            "Unregistering {} after {}s",
            key.hostname,
            record.age().num_seconds()
        );
        match self.advertiser.unregister(&record.handle).await {
            Ok(()) => {
                self.emit_event(EngineEvent::Unregistered {
                    hostname: key.clone(),
                });
            }
            Err(e) => {
                error!("Failed to unregister hostname {}: {}", key.hostname, e);
                self.emit_event(EngineEvent::UnregistrationFailed {
                    hostname: key.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
