//! Endpoint registry shared between the server, forwarder, and watchers
//!
//! All mutation happens under a single `parking_lot::RwLock`; lock holds are
//! short and never span an await point. Callers that need to inspect or rank
//! endpoints work on cloned snapshots.

mod endpoint;

pub use endpoint::{Endpoint, HeadState, SampleWindow};

use crate::config::EndpointConfig;
use parking_lot::RwLock;
use tracing::debug;

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    AlreadyRegistered,
}

/// Shared endpoint registry, keyed by endpoint URL and filterable by chain id
pub struct Registry {
    endpoints: RwLock<Vec<Endpoint>>,
    stats_window: usize,
}

impl Registry {
    pub fn new(stats_window: usize) -> Self {
        Self {
            endpoints: RwLock::new(Vec::new()),
            stats_window,
        }
    }

    /// Register an endpoint. Idempotent on URL: a duplicate registration
    /// leaves the existing entry untouched.
    pub fn register(&self, config: EndpointConfig) -> RegisterOutcome {
        let mut guard = self.endpoints.write();
        if guard.iter().any(|ep| ep.url() == config.url) {
            return RegisterOutcome::AlreadyRegistered;
        }
        debug!(url = %config.url, chain_id = config.chain_id, "registering endpoint");
        guard.push(Endpoint::new(config, self.stats_window));
        RegisterOutcome::Added
    }

    /// Total registered endpoints across all chains
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    /// Clone the endpoints serving a chain
    pub fn snapshot_for_chain(&self, chain_id: u64) -> Vec<Endpoint> {
        self.endpoints
            .read()
            .iter()
            .filter(|ep| ep.chain_id() == chain_id)
            .cloned()
            .collect()
    }

    /// Clone every endpoint
    pub fn snapshot(&self) -> Vec<Endpoint> {
        self.endpoints.read().clone()
    }

    /// Record latencies and an arrival timestamp for a served request
    pub fn record_served(&self, url: &str, queue_us: u64, upstream_us: u64, arrival_ms: u64) {
        let mut guard = self.endpoints.write();
        if let Some(ep) = guard.iter_mut().find(|ep| ep.url() == url) {
            ep.queue_latencies.push(queue_us);
            ep.upstream_latencies.push(upstream_us);
            ep.arrivals.push(arrival_ms);
        }
    }

    /// Update the observed chain head for an endpoint
    pub fn update_head(&self, url: &str, head: HeadState) {
        let mut guard = self.endpoints.write();
        if let Some(ep) = guard.iter_mut().find(|ep| ep.url() == url) {
            ep.head = head;
            debug!(url, block = head.block, "endpoint head updated");
        }
    }
}
