//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! drives its collaborators, without touching a cluster or the network.

#![allow(dead_code)]

use ingress_mdns_core::config::MdnsConfig;
use ingress_mdns_core::error::{Error, Result};
use ingress_mdns_core::traits::{
    Advertiser, IngressEvent, IngressSource, Registration, RegistrationHandle,
};
use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressRule, IngressSpec,
    IngressStatus, IngressTLS,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// An IngressSource that emits events on demand
pub struct ControlledIngressSource {
    /// Receiver for the engine's watch stream
    engine_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<IngressEvent>>>>,
    /// Call counter for watch()
    watch_call_count: Arc<AtomicUsize>,
}

impl ControlledIngressSource {
    /// Create a new controlled source and the sender feeding it
    pub fn new() -> (Self, mpsc::UnboundedSender<IngressEvent>) {
        let (test_tx, engine_rx) = mpsc::unbounded_channel();

        let source = Self {
            engine_rx: Arc::new(Mutex::new(Some(engine_rx))),
            watch_call_count: Arc::new(AtomicUsize::new(0)),
        };

        (source, test_tx)
    }

    /// Get the number of times watch() was called
    pub fn watch_call_count(&self) -> usize {
        self.watch_call_count.load(Ordering::SeqCst)
    }
}

impl IngressSource for ControlledIngressSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = IngressEvent> + Send + 'static>> {
        self.watch_call_count.fetch_add(1, Ordering::SeqCst);

        // Take the receiver (only called once)
        let rx = self
            .engine_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }

    fn source_name(&self) -> &'static str {
        "controlled"
    }
}

/// A source that never emits events (for idle testing)
pub struct IdleIngressSource;

impl IngressSource for IdleIngressSource {
    fn watch(&self) -> Pin<Box<dyn Stream<Item = IngressEvent> + Send + 'static>> {
        Box::pin(tokio_stream::pending::<IngressEvent>())
    }

    fn source_name(&self) -> &'static str {
        "idle"
    }
}

/// A mock Advertiser that records calls
///
/// Clones share counters, so a test keeps one clone while the engine owns
/// the other.
#[derive(Clone, Default)]
pub struct MockAdvertiser {
    register_call_count: Arc<AtomicUsize>,
    unregister_call_count: Arc<AtomicUsize>,
    shutdown_call_count: Arc<AtomicUsize>,
    /// Registrations in call order
    registrations: Arc<Mutex<Vec<Registration>>>,
    /// Full names passed to unregister() in call order
    unregistered: Arc<Mutex<Vec<String>>>,
    /// Currently announced full names; re-registering a name replaces it
    active: Arc<Mutex<HashSet<String>>>,
    /// Instance names whose registration fails
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every registration of `instance` fail
    pub fn fail_registration_of(&self, instance: &str) {
        self.failing.lock().unwrap().insert(instance.to_string());
    }

    pub fn register_call_count(&self) -> usize {
        self.register_call_count.load(Ordering::SeqCst)
    }

    pub fn unregister_call_count(&self) -> usize {
        self.unregister_call_count.load(Ordering::SeqCst)
    }

    pub fn shutdown_call_count(&self) -> usize {
        self.shutdown_call_count.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().unwrap().clone()
    }

    /// Instance names passed to register(), in call order
    pub fn registered_instances(&self) -> Vec<String> {
        self.registrations()
            .into_iter()
            .map(|registration| registration.instance)
            .collect()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.unregistered.lock().unwrap().clone()
    }

    /// Number of services currently announced
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Advertiser for MockAdvertiser {
    async fn register(&self, registration: &Registration) -> Result<RegistrationHandle> {
        self.register_call_count.fetch_add(1, Ordering::SeqCst);
        self.registrations.lock().unwrap().push(registration.clone());

        if self.failing.lock().unwrap().contains(&registration.instance) {
            return Err(Error::advertiser(format!(
                "name collision for {}",
                registration.instance
            )));
        }
        if registration.addresses.is_empty() {
            return Err(Error::advertiser("no address to advertise"));
        }

        let fullname = registration.fullname();
        self.active.lock().unwrap().insert(fullname.clone());
        Ok(RegistrationHandle::new(fullname))
    }

    async fn unregister(&self, handle: &RegistrationHandle) -> Result<()> {
        self.unregister_call_count.fetch_add(1, Ordering::SeqCst);
        self.unregistered
            .lock()
            .unwrap()
            .push(handle.fullname().to_string());
        self.active.lock().unwrap().remove(handle.fullname());
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn advertiser_name(&self) -> &'static str {
        "mock"
    }
}

/// Build an Ingress with the given rule hosts
pub fn ingress(name: &str, hosts: &[&str], tls: bool, ip: Option<&str>) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(
                hosts
                    .iter()
                    .map(|host| IngressRule {
                        host: Some(host.to_string()),
                        http: None,
                    })
                    .collect(),
            ),
            tls: tls.then(|| {
                vec![IngressTLS {
                    hosts: None,
                    secret_name: Some(format!("{name}-tls")),
                }]
            }),
            ..Default::default()
        }),
        status: ip.map(|ip| IngressStatus {
            load_balancer: Some(IngressLoadBalancerStatus {
                ingress: Some(vec![IngressLoadBalancerIngress {
                    ip: Some(ip.to_string()),
                    ..Default::default()
                }]),
            }),
        }),
    }
}

/// Add an annotation, leaving hosts untouched
pub fn annotated(mut ingress: Ingress, key: &str, value: &str) -> Ingress {
    ingress
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), value.to_string());
    ingress
}

/// Helper to create a minimal MdnsConfig for testing
pub fn minimal_config() -> MdnsConfig {
    let mut config = MdnsConfig::new("eth0");
    config.engine.event_channel_capacity = 100;
    config
}

/// Wait until the advertiser saw `count` register calls, or panic after 5s
pub async fn wait_for_registers(advertiser: &MockAdvertiser, count: usize) {
    tokio::time::timeout(tokio::time::Duration::from_secs(5), async {
        while advertiser.register_call_count() < count {
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("registrations did not happen in time");
}
