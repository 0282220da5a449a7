//! Runtime state tracked per registered endpoint

use crate::config::EndpointConfig;
use std::collections::VecDeque;

/// Fixed-capacity sample window. Newest samples sit at the front; once the
/// capacity is reached the oldest sample is evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, value: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_back();
        }
        self.samples.push_front(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample
    pub fn newest(&self) -> Option<u64> {
        self.samples.front().copied()
    }

    /// Oldest retained sample
    pub fn oldest(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
    }
}

/// Latest observed chain head for an endpoint, fed by the newHeads watcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadState {
    /// Block number
    pub block: u64,
    /// Block timestamp reported by the node, in ms
    pub block_ts_ms: u64,
    /// Wall-clock arrival of the notification, in ms
    pub observed_at_ms: u64,
}

/// A registered endpoint with its health samples
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub config: EndpointConfig,
    pub head: HeadState,
    /// Time spent inside the balancer before the upstream send, in µs
    pub queue_latencies: SampleWindow,
    /// Upstream round-trip latencies, in µs
    pub upstream_latencies: SampleWindow,
    /// Wall-clock ms timestamps of requests served by this endpoint
    pub arrivals: SampleWindow,
}

impl Endpoint {
    pub fn new(config: EndpointConfig, stats_window: usize) -> Self {
        Self {
            config,
            head: HeadState::default(),
            queue_latencies: SampleWindow::new(stats_window),
            upstream_latencies: SampleWindow::new(stats_window),
            arrivals: SampleWindow::new(stats_window),
        }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Mean upstream round-trip latency in µs, 0 before any sample
    pub fn avg_upstream_latency(&self) -> f64 {
        self.upstream_latencies.mean()
    }

    /// Requests per minute over the retained arrival window. Needs at least
    /// two samples to define a rate.
    pub fn requests_per_minute(&self) -> f64 {
        if self.arrivals.len() < 2 {
            return 0.0;
        }
        let oldest = self.arrivals.oldest().unwrap_or(0);
        let newest = self.arrivals.newest().unwrap_or(0);
        if newest <= oldest {
            return 0.0;
        }
        let minutes = (newest - oldest) as f64 / 60_000.0;
        self.arrivals.len() as f64 / minutes
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.config.url == other.config.url
    }
}
