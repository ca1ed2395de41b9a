// # Kubernetes Ingress Source
//
// This crate provides an IngressSource backed by the Kubernetes API.
//
// ## Implementation
//
// Uses the `kube` runtime watcher, which lists every Ingress in the cluster
// and then follows the watch, re-listing transparently after the watch
// expires or the connection drops.
//
// The watcher only reports the current state of an object. The engine needs
// the previous state as well to tell which hostnames went away, so this
// crate keeps the last seen version of every Ingress in an
// [`IngressTracker`] and turns watcher events into add/update/delete events.
//
// ## Re-lists
//
// During a re-list the watcher replays every live object between `Init` and
// `InitDone`. Objects that were known before the re-list but not replayed
// were deleted while the watch was down; they are reported as deletions
// when `InitDone` arrives.
//
// ## Errors
//
// Watch errors are logged and retried with the watcher's default backoff.
// The stream itself never ends while the client is alive.

use futures::{StreamExt, stream};
use ingress_mdns_core::traits::{IngressEvent, IngressSource, object_key};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Cluster-wide Ingress watch
pub struct KubeIngressSource {
    client: Client,
    config: WatcherConfig,
}

impl KubeIngressSource {
    /// Watch every Ingress in every namespace
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config: WatcherConfig::default(),
        }
    }

    /// Restrict the watch with a label selector (e.g. "mdns=enabled")
    pub fn with_label_selector(mut self, selector: &str) -> Self {
        self.config = self.config.labels(selector);
        self
    }
}

impl IngressSource for KubeIngressSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = IngressEvent> + Send + 'static>> {
        let api: Api<Ingress> = Api::all(self.client.clone());
        let mut tracker = IngressTracker::new();

        info!("Starting Ingress watcher");

        let events = watcher(api, self.config.clone())
            .default_backoff()
            .flat_map(move |event| {
                let translated = match event {
                    Ok(event) => tracker.apply(event),
                    Err(e) => {
                        warn!("Ingress watcher error: {}", e);
                        Vec::new()
                    }
                };
                stream::iter(translated)
            });

        Box::pin(events)
    }

    fn source_name(&self) -> &'static str {
        "kubernetes"
    }
}

/// Last seen version of every Ingress, keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct IngressTracker {
    known: HashMap<String, Ingress>,
    /// Keys replayed by the re-list in progress, if any
    relisted: Option<HashSet<String>>,
}

impl IngressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of Ingress objects currently known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Translate one watcher event into zero or more Ingress events
    pub fn apply(&mut self, event: watcher::Event<Ingress>) -> Vec<IngressEvent> {
        match event {
            watcher::Event::Init => {
                debug!("Ingress watcher (re)listing");
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(ingress) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(object_key(&ingress));
                }
                vec![self.upsert(ingress)]
            }
            watcher::Event::InitDone => {
                let relisted = self.relisted.take().unwrap_or_default();
                let gone: Vec<String> = self
                    .known
                    .keys()
                    .filter(|key| !relisted.contains(*key))
                    .cloned()
                    .collect();

                info!(
                    "Ingress watcher synced: {} live, {} removed while disconnected",
                    relisted.len(),
                    gone.len()
                );

                gone.into_iter()
                    .filter_map(|key| self.known.remove(&key))
                    .map(IngressEvent::Deleted)
                    .collect()
            }
            watcher::Event::Apply(ingress) => vec![self.upsert(ingress)],
            watcher::Event::Delete(ingress) => {
                let key = object_key(&ingress);
                debug!("Ingress deleted: {}", key);
                // The cached version carries the hostnames that were registered
                let last = self.known.remove(&key).unwrap_or(ingress);
                vec![IngressEvent::Deleted(last)]
            }
        }
    }

    fn upsert(&mut self, ingress: Ingress) -> IngressEvent {
        let key = object_key(&ingress);
        match self.known.insert(key, ingress.clone()) {
            Some(old) => IngressEvent::updated(old, ingress),
            None => IngressEvent::Added(ingress),
        }
    }
}
