//! Contract Test: Idempotency
//!
//! This test verifies that repeated or irrelevant events never cause
//! duplicate advertisements or churn.
//!
//! Constraints verified:
//! - Re-adding an Ingress registers nothing new
//! - Updates that leave the hostname set unchanged make no advertiser calls
//! - Hostname order within an Ingress does not matter
//!
//! If this test fails, the engine is re-announcing services needlessly.

mod common;

use common::*;
use ingress_mdns_core::{IngressEvent, LocalHostname, ReconcileEngine};

fn engine_with(advertiser: &MockAdvertiser) -> ReconcileEngine {
    let (source, _tx) = ControlledIngressSource::new();
    let (engine, _event_rx) =
        ReconcileEngine::new(Box::new(source), Box::new(advertiser.clone()), minimal_config())
            .expect("engine construction succeeds");
    engine
}

#[tokio::test]
async fn duplicate_add_registers_once() {
    let advertiser = MockAdvertiser::new();
    let mut engine = engine_with(&advertiser);

    let web = ingress("web", &["foo.local", "bar.local"], false, Some("10.0.0.7"));

    engine.handle_event(IngressEvent::Added(web.clone())).await;
    engine.handle_event(IngressEvent::Added(web)).await;

    assert_eq!(
        advertiser.register_call_count(),
        2,
        "Expected 2 registrations for 2 hostnames added twice"
    );
    assert_eq!(engine.store().len(), 2);
    assert!(engine.store().contains(&LocalHostname::new("foo", false)));
    assert!(engine.store().contains(&LocalHostname::new("bar", false)));
}

#[tokio::test]
async fn annotation_only_update_makes_no_calls() {
    let advertiser = MockAdvertiser::new();
    let mut engine = engine_with(&advertiser);

    let old = ingress("web", &["foo.local"], false, Some("10.0.0.7"));
    engine.handle_event(IngressEvent::Added(old.clone())).await;

    let new = annotated(old.clone(), "team", "platform");
    engine.handle_event(IngressEvent::updated(old, new)).await;

    assert_eq!(advertiser.register_call_count(), 1);
    assert_eq!(advertiser.unregister_call_count(), 0);
    assert_eq!(engine.store().len(), 1);
}

#[tokio::test]
async fn reordered_hosts_make_no_calls() {
    let advertiser = MockAdvertiser::new();
    let mut engine = engine_with(&advertiser);

    let old = ingress("web", &["a.local", "b.local"], false, Some("10.0.0.7"));
    let new = ingress("web", &["b.local", "a.local"], false, Some("10.0.0.7"));

    engine.handle_event(IngressEvent::Added(old.clone())).await;
    engine.handle_event(IngressEvent::updated(old, new)).await;

    assert_eq!(advertiser.register_call_count(), 2);
    assert_eq!(advertiser.unregister_call_count(), 0);
}

#[tokio::test]
async fn status_only_update_makes_no_calls() {
    // The load balancer IP alone does not trigger re-registration
    let advertiser = MockAdvertiser::new();
    let mut engine = engine_with(&advertiser);

    let old = ingress("web", &["a.local"], false, Some("10.0.0.7"));
    let new = ingress("web", &["a.local"], false, Some("10.0.0.8"));

    engine.handle_event(IngressEvent::Added(old.clone())).await;
    engine.handle_event(IngressEvent::updated(old, new)).await;

    assert_eq!(advertiser.register_call_count(), 1);
    assert_eq!(advertiser.unregister_call_count(), 0);
}

#[tokio::test]
async fn non_local_hosts_are_ignored() {
    let advertiser = MockAdvertiser::new();
    let mut engine = engine_with(&advertiser);

    let public = ingress("public", &["www.example.com"], true, Some("10.0.0.7"));
    engine.handle_event(IngressEvent::Added(public.clone())).await;
    engine.handle_event(IngressEvent::Deleted(public)).await;

    assert_eq!(advertiser.register_call_count(), 0);
    assert_eq!(advertiser.unregister_call_count(), 0);
    assert!(engine.store().is_empty());
}
