//! Configuration types for the ingress-mdns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main ingress-mdns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdnsConfig {
    /// How hostnames are advertised on the local network
    pub advertise: AdvertiseConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MdnsConfig {
    /// Create a configuration broadcasting on the given interface, with defaults
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            advertise: AdvertiseConfig::new(interface),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.advertise.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Advertisement settings shared by every registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertiseConfig {
    /// Network interface the responder binds to (e.g., "eth0")
    pub interface: String,

    /// Suffix marking an Ingress host as mDNS-advertised (e.g., ".local")
    #[serde(default = "default_local_suffix")]
    pub local_suffix: String,

    /// DNS-SD service type, without the domain
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// mDNS domain, without dots
    #[serde(default = "default_domain")]
    pub domain: String,

    /// TXT records attached to every service
    #[serde(default = "default_txt_records")]
    pub txt_records: BTreeMap<String, String>,
}

impl AdvertiseConfig {
    /// Create advertisement settings for an interface
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            local_suffix: default_local_suffix(),
            service_type: default_service_type(),
            domain: default_domain(),
            txt_records: default_txt_records(),
        }
    }

    /// Set the local suffix
    pub fn with_local_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.local_suffix = suffix.into();
        self
    }

    /// Validate the advertisement settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interface.is_empty() {
            return Err(crate::Error::config("Broadcast interface cannot be empty"));
        }
        if self.local_suffix.len() < 2 || !self.local_suffix.starts_with('.') {
            return Err(crate::Error::config(format!(
                "Local suffix must start with '.' and name a label, got '{}'",
                self.local_suffix
            )));
        }
        if !self.service_type.starts_with('_') || self.service_type.ends_with('.') {
            return Err(crate::Error::config(format!(
                "Service type must look like '_http._tcp', got '{}'",
                self.service_type
            )));
        }
        if self.domain.is_empty() || self.domain.contains('.') {
            return Err(crate::Error::config(format!(
                "mDNS domain must be a single label, got '{}'",
                self.domain
            )));
        }

        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the monitoring event channel
    ///
    /// When full, new engine events will be dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_local_suffix() -> String {
    ".local".to_string()
}

fn default_service_type() -> String {
    "_http._tcp".to_string()
}

fn default_domain() -> String {
    "local".to_string()
}

fn default_txt_records() -> BTreeMap<String, String> {
    BTreeMap::from([("path".to_string(), "/".to_string())])
}

fn default_event_channel_capacity() -> usize {
    1000
}
