//! RPC endpoint configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where an endpoint lives relative to the balancer. Local endpoints are
/// preferred over external ones when ranking ties on block height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RpcLocation {
    #[default]
    Local,
    External,
}

impl FromStr for RpcLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(RpcLocation::Local),
            "external" => Ok(RpcLocation::External),
            other => Err(ConfigError::InvalidLocation(other.to_string())),
        }
    }
}

impl TryFrom<String> for RpcLocation {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RpcLocation> for String {
    fn from(loc: RpcLocation) -> Self {
        match loc {
            RpcLocation::Local => "local".to_string(),
            RpcLocation::External => "external".to_string(),
        }
    }
}

/// Configuration for a single upstream endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// HTTP JSON-RPC URL
    pub url: String,
    /// WebSocket URL used for the newHeads subscription
    pub ws_url: String,
    /// Chain this endpoint serves (ethereum = 1, optimism = 10, base = 8453)
    pub chain_id: u64,
    /// Location classifier
    #[serde(default)]
    pub location: RpcLocation,
}

impl EndpointConfig {
    pub fn new(
        url: impl Into<String>,
        ws_url: impl Into<String>,
        chain_id: u64,
        location: RpcLocation,
    ) -> Self {
        Self {
            url: url.into(),
            ws_url: ws_url.into(),
            chain_id,
            location,
        }
    }
}
