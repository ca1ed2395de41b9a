//! Core traits for the ingress-mdns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IngressSource`]: Deliver Ingress add/update/delete events from the cluster
//! - [`Advertiser`]: Register and unregister mDNS services

pub mod ingress_source;
pub mod advertiser;

pub use ingress_source::{IngressSource, IngressEvent, IngressEventKind, object_key};
pub use advertiser::{Advertiser, Registration, RegistrationHandle};
