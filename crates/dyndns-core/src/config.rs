//! Configuration types for the dyndns system
//!
//! The configuration file is a JSON document:
//!
//! ```json
//! {
//!   "ipv4": true,
//!   "ipv6": { "enable": true, "teredo": false },
//!   "ttl": 300,
//!   "cache": true,
//!   "hostname": "host.example.com",
//!   "tsig": {
//!     "algorithm": "hmac-sha256",
//!     "keyname": "host-key",
//!     "key": "bWFydmlu..."
//!   },
//!   "logging": { "level": "info" }
//! }
//! ```
//!
//! `cache` is a tri-state: `false` disables the persisted state entirely,
//! `true` uses the platform's default location, and a string selects an
//! explicit path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::update::tsig_algorithm;

/// Main dyndns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether IPv4 addresses are registered
    #[serde(default = "default_true")]
    pub ipv4: bool,

    /// IPv6 handling
    #[serde(default)]
    pub ipv6: Ipv6Config,

    /// Time-to-live for the published records, in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Persisted-state file selection
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fully qualified name to publish; defaults to the system hostname
    #[serde(default)]
    pub hostname: Option<String>,

    /// Optional TSIG authentication material
    #[serde(default)]
    pub tsig: Option<TsigConfig>,

    /// Logging settings for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            Error::config(format!(
                "failed to parse configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// An unknown TSIG algorithm is rejected here, before any network
    /// traffic happens.
    pub fn validate(&self) -> Result<()> {
        if self.ttl == 0 {
            return Err(Error::config("ttl must be greater than zero"));
        }
        if let Some(tsig) = &self.tsig {
            tsig.validate()?;
        }
        Ok(())
    }

    /// Returns whether any address family is enabled.
    pub fn any_family_enabled(&self) -> bool {
        self.ipv4 || self.ipv6.enable
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ipv4: true,
            ipv6: Ipv6Config::default(),
            ttl: default_ttl(),
            cache: CacheConfig::default(),
            hostname: None,
            tsig: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// IPv6 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ipv6Config {
    /// Whether IPv6 addresses are registered
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Whether Teredo tunnel addresses are acceptable
    #[serde(default)]
    pub teredo: bool,
}

impl Default for Ipv6Config {
    fn default() -> Self {
        Self {
            enable: true,
            teredo: false,
        }
    }
}

/// Persisted-state file selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheConfig {
    /// `true`: platform default location, `false`: no persisted state
    Enabled(bool),
    /// An explicit file path
    Path(PathBuf),
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Enabled(true)
    }
}

/// TSIG authentication material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsigConfig {
    /// Algorithm name, e.g. `hmac-sha256`
    pub algorithm: String,
    /// Key name as known to the nameserver
    pub keyname: String,
    /// Key material, base64 encoded
    pub key: String,
}

impl TsigConfig {
    /// Check the algorithm against the fixed known set.
    pub fn validate(&self) -> Result<()> {
        tsig_algorithm(&self.algorithm)?;
        if self.keyname.is_empty() {
            return Err(Error::config("tsig keyname cannot be empty"));
        }
        if self.key.is_empty() {
            return Err(Error::config("tsig key cannot be empty"));
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}
