//! Configuration file handling

use super::EndpointConfig;
use crate::balance::Strategy;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Default listen port when the configured address omits one
pub const DEFAULT_PORT: u16 = 3003;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Balancer settings
    #[serde(default)]
    pub balancer: Settings,

    /// Endpoints seeded into the registry at startup
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Balancer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Listen address, `host` or `host:port` (`localhost` accepted)
    #[serde(default = "default_address")]
    pub address: String,

    /// Endpoint ranking strategy
    #[serde(default)]
    pub strategy: Strategy,

    /// Number of latency samples retained per endpoint
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,

    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_address() -> String {
    "127.0.0.1:3003".to_string()
}

fn default_stats_window() -> usize {
    1000
}

fn default_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: default_address(),
            strategy: Strategy::default(),
            stats_window: default_stats_window(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ConfigFile {
    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load a config file if it exists, falling back to defaults otherwise.
    /// Used for the default config path, where absence just means an empty
    /// registry until endpoints are registered over HTTP.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the configured listen address to a socket address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_listen_addr(&self.balancer.address)
    }
}

/// Parse `host` or `host:port`, accepting `localhost` and defaulting the port
pub fn parse_listen_addr(address: &str) -> Result<SocketAddr> {
    let address = address.replace("localhost", "127.0.0.1");
    let address = if address.contains(':') {
        address
    } else {
        format!("{}:{}", address, DEFAULT_PORT)
    };

    address
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidAddress(format!("{}: {}", address, e)).into())
}
