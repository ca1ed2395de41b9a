// # Registration State
//
// In-memory bookkeeping of which hostnames are currently advertised.
// Nothing here survives a restart: the watch replays every Ingress on
// startup and the store is rebuilt from that.

pub mod memory;

pub use memory::{RecordStore, RegistrationRecord};
