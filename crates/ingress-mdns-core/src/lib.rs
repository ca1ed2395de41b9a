// # ingress-mdns-core
//
// Core library keeping mDNS advertisements in step with cluster Ingresses.
//
// ## Architecture Overview
//
// This library provides the reconciliation between Ingress objects and
// locally-broadcast mDNS services:
// - **IngressSource**: Trait for receiving Ingress add/update/delete events
// - **Advertiser**: Trait for registering services with an mDNS responder
// - **hostname::extract**: Pure Ingress → local hostnames + IP mapping
// - **RecordStore**: Active registrations, owned by the engine
// - **ReconcileEngine**: Orchestrates the Ingress event → mDNS flow and
//   withdraws every registration on shutdown
//
// ## Design Principles
//
// 1. **One-way**: Cluster state drives announcements, never the reverse
// 2. **Event-Driven**: Ingress changes arrive as an async stream
// 3. **Single writer**: The engine owns its store and handles one event at a time
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Failure isolation**: One hostname failing never blocks the others

pub mod traits;
pub mod engine;
pub mod hostname;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{Advertiser, IngressEvent, IngressSource, Registration, RegistrationHandle};
pub use engine::{EngineEvent, ReconcileEngine, ShutdownReport};
pub use hostname::{IngressSnapshot, LocalHostname, extract};
pub use config::{AdvertiseConfig, EngineConfig, MdnsConfig};
pub use error::{Error, Result};
pub use state::{RecordStore, RegistrationRecord};
