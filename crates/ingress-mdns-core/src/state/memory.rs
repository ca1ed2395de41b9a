// # Record Store
//
// In-memory map from local hostname identity to its active registration.
//
// ## Ownership
//
// The store is owned by value by `ReconcileEngine` and mutated through
// `&mut self` only. There is no lock: single-writer access comes from the
// engine handling one event at a time.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - Announcements made before a crash expire on peers by TTL
// - The watch replays every Ingress on startup, so the store is reseeded

use std::collections::HashMap;

use crate::hostname::LocalHostname;
use crate::traits::RegistrationHandle;

/// An active registration for one local hostname
#[derive(Debug, Clone)]
pub struct RegistrationRecord {
    /// Identity of the advertised hostname
    pub key: LocalHostname,
    /// Handle returned by the advertiser
    pub handle: RegistrationHandle,
    /// When the registration succeeded
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl RegistrationRecord {
    pub(crate) fn new(key: LocalHostname, handle: RegistrationHandle) -> Self {
        Self {
            key,
            handle,
            registered_at: chrono::Utc::now(),
        }
    }

    /// How long the hostname has been advertised
    pub fn age(&self) -> chrono::Duration {
        chrono::Utc::now().signed_duration_since(self.registered_at)
    }
}

/// Map of active registrations
///
/// At most one record per [`LocalHostname`]; a key present here means its
/// handle is currently announced on the network.
///
/// Keys differing only in the TLS flag announce the same service name, so
/// the responder holds at most one of them. The store mirrors that: at most
/// one key owns a given full name, and storing a second one evicts the
/// first.
///
/// # Example
///
/// ```rust
/// use ingress_mdns_core::{LocalHostname, RecordStore, RegistrationHandle};
///
/// let mut store = RecordStore::new();
/// let key = LocalHostname::new("grafana", false);
///
/// store.put(key.clone(), RegistrationHandle::new("grafana._http._tcp.local."));
/// assert!(store.contains(&key));
/// assert_eq!(store.owner_of("grafana._http._tcp.local."), Some(&key));
///
/// let record = store.remove(&key).expect("stored above");
/// assert_eq!(record.handle.fullname(), "grafana._http._tcp.local.");
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<LocalHostname, RegistrationRecord>,
    /// Full service name to the key announcing it
    owners: HashMap<String, LocalHostname>,
}

impl RecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle registered for a key
    pub fn get(&self, key: &LocalHostname) -> Option<&RegistrationHandle> {
        self.records.get(key).map(|record| &record.handle)
    }

    pub fn contains(&self, key: &LocalHostname) -> bool {
        self.records.contains_key(key)
    }

    /// Key currently announcing `fullname`, if any
    pub fn owner_of(&self, fullname: &str) -> Option<&LocalHostname> {
        self.owners.get(fullname)
    }

    /// Store the handle for a key
    ///
    /// Returns the records this displaced: the key's previous record, and
    /// any other key's record that held the same full name.
    pub fn put(&mut self, key: LocalHostname, handle: RegistrationHandle) -> Vec<RegistrationRecord> {
        let mut displaced = Vec::new();

        if let Some(previous) = self.remove(&key) {
            displaced.push(previous);
        }
        if let Some(alias) = self.owners.get(handle.fullname()).cloned()
            && let Some(record) = self.remove(&alias)
        {
            displaced.push(record);
        }

        self.owners.insert(handle.fullname().to_string(), key.clone());
        self.records.insert(key.clone(), RegistrationRecord::new(key, handle));

        displaced
    }

    /// Remove a key, returning its record
    pub fn remove(&mut self, key: &LocalHostname) -> Option<RegistrationRecord> {
        let record = self.records.remove(key)?;
        if self.owners.get(record.handle.fullname()) == Some(key) {
            self.owners.remove(record.handle.fullname());
        }
        Some(record)
    }

    /// Snapshot of every key currently present
    pub fn keys(&self) -> Vec<LocalHostname> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
