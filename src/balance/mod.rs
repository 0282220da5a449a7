//! Endpoint ranking strategies
//!
//! Both strategies rank by chain head first: an endpoint that has seen a newer
//! block always wins. Local endpoints break ties against external ones. The
//! final tiebreaker is what distinguishes the strategies.

use crate::config::RpcLocation;
use crate::error::ConfigError;
use crate::registry::Endpoint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Ranking strategy for picking the upstream endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// Freshest head first: endpoints whose head arrived most recently win ties
    #[default]
    MinLatency,
    /// Spread load: endpoints with the lowest observed request rate win ties
    RoundRobin,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min_latency" => Ok(Strategy::MinLatency),
            "round_robin" => Ok(Strategy::RoundRobin),
            other => Err(ConfigError::InvalidStrategy(other.to_string())),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::MinLatency => "min_latency".to_string(),
            Strategy::RoundRobin => "round_robin".to_string(),
        }
    }
}

/// Order a chain's endpoints best-first according to the strategy
pub fn rank_endpoints(strategy: Strategy, mut endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    match strategy {
        Strategy::MinLatency => {
            endpoints.sort_by(|a, b| {
                base_order(a, b).then_with(|| a.head.observed_at_ms.cmp(&b.head.observed_at_ms))
            });
        }
        Strategy::RoundRobin => {
            endpoints.sort_by(|a, b| {
                base_order(a, b).then_with(|| {
                    a.requests_per_minute()
                        .partial_cmp(&b.requests_per_minute())
                        .unwrap_or(Ordering::Equal)
                })
            });
        }
    }
    endpoints
}

/// Shared prefix of both orderings: head block desc, then local preference
fn base_order(a: &Endpoint, b: &Endpoint) -> Ordering {
    b.head
        .block
        .cmp(&a.head.block)
        .then_with(|| location_order(a.config.location, b.config.location))
}

fn location_order(a: RpcLocation, b: RpcLocation) -> Ordering {
    match (a, b) {
        (RpcLocation::Local, RpcLocation::External) => Ordering::Less,
        (RpcLocation::External, RpcLocation::Local) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
