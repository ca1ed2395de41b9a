//! Error types for the ingress-mdns system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for ingress-mdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ingress-mdns system
#[derive(Error, Debug)]
pub enum Error {
    /// mDNS advertiser errors (registration conflicts, interface down, ...)
    #[error("Advertiser error: {0}")]
    Advertiser(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// Requested item does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Create an advertiser error
    pub fn advertiser(msg: impl Into<String>) -> Self {
        Self::Advertiser(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
