//! Request forwarding to upstream endpoints

use crate::balance::{rank_endpoints, Strategy};
use crate::error::{Result, RpcError};
use crate::registry::Registry;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Forwards JSON-RPC bodies to the best-ranked endpoint of a chain, with
/// failover down the ranking and latency bookkeeping on success.
pub struct Forwarder {
    client: reqwest::Client,
    registry: Arc<Registry>,
    strategy: Strategy,
}

impl Forwarder {
    pub fn new(registry: Arc<Registry>, strategy: Strategy, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::from)?;

        Ok(Self {
            client,
            registry,
            strategy,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Forward a call to the chain's endpoints in rank order. The first
    /// upstream body that comes back is returned verbatim.
    pub async fn forward(&self, chain_id: u64, body: &Value) -> Result<String> {
        let started = Instant::now();

        let snapshot = self.registry.snapshot_for_chain(chain_id);
        if snapshot.is_empty() {
            return Err(RpcError::NoEndpointsForChain(chain_id).into());
        }

        let ranked = rank_endpoints(self.strategy, snapshot);
        debug!(
            chain_id,
            candidates = ranked.len(),
            "forwarding request"
        );

        let mut last_err: Option<RpcError> = None;
        for endpoint in &ranked {
            let queue_us = started.elapsed().as_micros() as u64;
            let sent = Instant::now();
            match self.send(endpoint.url(), body).await {
                Ok(response) => {
                    let upstream_us = sent.elapsed().as_micros() as u64;
                    let arrival_ms = chrono::Utc::now().timestamp_millis() as u64;
                    self.registry
                        .record_served(endpoint.url(), queue_us, upstream_us, arrival_ms);
                    info!(
                        url = %endpoint.url(),
                        queue_us,
                        upstream_us,
                        "request served"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    warn!(url = %endpoint.url(), error = %e, "endpoint failed, trying next");
                    last_err = Some(e);
                }
            }
        }

        // Surface the last classified failure so callers can tell a timeout
        // from a refused connection
        Err(last_err.unwrap_or(RpcError::AllEndpointsFailed).into())
    }

    /// Fan a raw transaction out to every endpoint of the chain concurrently.
    /// The first body carrying a non-null `result` wins; if none does, the
    /// first collected body is returned so the caller sees the upstream
    /// rejection.
    pub async fn broadcast(&self, chain_id: u64, body: &Value) -> Result<String> {
        let snapshot = self.registry.snapshot_for_chain(chain_id);
        if snapshot.is_empty() {
            return Err(RpcError::NoEndpointsForChain(chain_id).into());
        }

        let mut futures: FuturesUnordered<_> = snapshot
            .iter()
            .map(|ep| {
                let url = ep.url().to_string();
                async move {
                    let result = self.send(&url, body).await;
                    (url, result)
                }
            })
            .collect();

        let mut first_body: Option<String> = None;
        let mut last_err: Option<RpcError> = None;
        while let Some((url, result)) = futures.next().await {
            match result {
                Ok(response) => {
                    let has_result = serde_json::from_str::<Value>(&response)
                        .ok()
                        .map_or(false, |v| !v["result"].is_null());
                    if has_result {
                        info!(url = %url, "broadcast accepted");
                        return Ok(response);
                    }
                    debug!(url = %url, "broadcast response without result");
                    first_body.get_or_insert(response);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "broadcast send failed");
                    last_err = Some(e);
                }
            }
        }

        match first_body {
            Some(body) => Ok(body),
            None => Err(last_err.unwrap_or(RpcError::AllEndpointsFailed).into()),
        }
    }

    /// POST the body to one upstream URL, classifying transport and status
    /// failures
    async fn send(&self, url: &str, body: &Value) -> std::result::Result<String, RpcError> {
        let response = match self.client.post(url).json(body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(RpcError::Timeout),
            Err(e) if e.is_connect() => return Err(RpcError::ConnectionFailed(e.to_string())),
            Err(e) => return Err(RpcError::Http(e)),
        };

        let status = response.status();
        if status.is_client_error() {
            return Err(RpcError::UpstreamBadRequest(status.as_u16()));
        }
        if status.is_server_error() {
            return Err(RpcError::UpstreamServerError(status.as_u16()));
        }

        response.text().await.map_err(RpcError::Http)
    }
}
