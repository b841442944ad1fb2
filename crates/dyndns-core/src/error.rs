//! Error types for the dyndns system
//!
//! The variants follow the failure taxonomy of the updater: configuration
//! errors are fatal before any network traffic, discovery and cache errors
//! degrade gracefully at their call sites, and resolution or endpoint
//! exhaustion errors terminate the run.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for dyndns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyndns system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (unknown TSIG algorithm, no families enabled, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Address discovery errors
    #[error("address source error: {0}")]
    Source(String),

    /// Persisted-state store errors
    #[error("state store error: {0}")]
    StateStore(String),

    /// Nameserver discovery errors (SOA lookup, endpoint resolution)
    #[error("resolution error: {0}")]
    Resolution(String),

    /// DNS message construction or parsing errors
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Every candidate nameserver endpoint failed
    #[error("unable to contact any nameserver: {0}")]
    Exhausted(DeliveryFailures),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an address source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// One failed delivery attempt against a nameserver endpoint.
#[derive(Clone, Debug)]
pub struct EndpointFailure {
    /// The endpoint that was tried
    pub endpoint: SocketAddr,
    /// Why the attempt failed
    pub reason: String,
}

/// The full list of failed delivery attempts for one run.
///
/// Displayed as a `; `-separated list naming every endpoint and its
/// individual failure reason.
#[derive(Clone, Debug, Default)]
pub struct DeliveryFailures(pub Vec<EndpointFailure>);

impl fmt::Display for DeliveryFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.endpoint, failure.reason)?;
        }
        Ok(())
    }
}
