//! HTTP server exposing the balancer
//!
//! `POST /{chain_id}` takes either JSON-RPC calls (proxied upstream) or
//! endpoint registrations. Responses are always HTTP 200 with a JSON body;
//! balancer-level failures are reported as JSON-RPC error objects.

use crate::config::EndpointConfig;
use crate::error::{Error, Result, RpcError};
use crate::jsonrpc::{
    BalancerRequest, JsonRpcErrorReply, JsonRpcRequest, JsonRpcResult, RegisterRequest,
    INVALID_REQUEST, PARSE_ERROR, UPSTREAM_FAILED,
};
use crate::proxy::Forwarder;
use crate::registry::{Endpoint, RegisterOutcome, Registry};
use crate::watch;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared server state
pub struct AppState {
    pub registry: Arc<Registry>,
    pub forwarder: Arc<Forwarder>,
}

/// Register an endpoint and start its head watcher if it is new
pub fn register_endpoint(registry: &Arc<Registry>, config: EndpointConfig) -> RegisterOutcome {
    let outcome = registry.register(config.clone());
    if outcome == RegisterOutcome::Added {
        info!(url = %config.url, chain_id = config.chain_id, "endpoint registered");
        watch::spawn(registry.clone(), config.url, config.ws_url);
    }
    outcome
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/endpoints", get(endpoints_handler))
        .route("/:chain_id", post(chain_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until shutdown
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "balancer listening");
    axum::serve(listener, router(state))
        .await
        .map_err(Error::Io)?;
    Ok(())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": state.registry.len(),
    }))
}

/// Snapshot entry returned by `GET /endpoints`
#[derive(Debug, Serialize)]
struct EndpointSummary {
    url: String,
    chain_id: u64,
    location: String,
    last_block: u64,
    last_block_ts_ms: u64,
    head_observed_at_ms: u64,
    avg_queue_latency_us: f64,
    avg_upstream_latency_us: f64,
    requests_per_minute: f64,
    requests_sampled: usize,
}

impl From<&Endpoint> for EndpointSummary {
    fn from(ep: &Endpoint) -> Self {
        Self {
            url: ep.config.url.clone(),
            chain_id: ep.config.chain_id,
            location: String::from(ep.config.location),
            last_block: ep.head.block,
            last_block_ts_ms: ep.head.block_ts_ms,
            head_observed_at_ms: ep.head.observed_at_ms,
            avg_queue_latency_us: ep.queue_latencies.mean(),
            avg_upstream_latency_us: ep.avg_upstream_latency(),
            requests_per_minute: ep.requests_per_minute(),
            requests_sampled: ep.arrivals.len(),
        }
    }
}

async fn endpoints_handler(State(state): State<Arc<AppState>>) -> Json<Vec<EndpointSummary>> {
    let snapshot = state.registry.snapshot();
    Json(snapshot.iter().map(EndpointSummary::from).collect())
}

async fn chain_handler(
    State(state): State<Arc<AppState>>,
    Path(chain_id): Path<String>,
    body: String,
) -> impl IntoResponse {
    let reply = handle_chain_request(&state, &chain_id, &body).await;
    ([(header::CONTENT_TYPE, "application/json")], reply)
}

async fn handle_chain_request(state: &AppState, chain_id: &str, body: &str) -> String {
    let chain_id = match chain_id.parse::<u64>() {
        Ok(id) if id != 0 => id,
        _ => {
            let reply = JsonRpcErrorReply::new(
                Value::Null,
                INVALID_REQUEST,
                RpcError::MissingChainId.to_string(),
            );
            error!(chain_id, "rejected request: {}", reply.error.message);
            return reply.to_json();
        }
    };

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            let reply = JsonRpcErrorReply::new(Value::Null, PARSE_ERROR, format!("invalid JSON: {e}"));
            error!(chain_id, "rejected request: {}", reply.error.message);
            return reply.to_json();
        }
    };

    match BalancerRequest::parse(&value) {
        Ok(BalancerRequest::Call(req)) => {
            if req.method == "eth_sendRawTransaction" {
                dispatch_broadcast(state, chain_id, &req, &value).await
            } else {
                dispatch_forward(state, chain_id, req.id.clone(), &value).await
            }
        }
        Ok(BalancerRequest::CallBatch(_)) => {
            dispatch_forward(state, chain_id, Value::Null, &value).await
        }
        Ok(BalancerRequest::Register(req)) => register_one(state, req),
        Ok(BalancerRequest::RegisterBatch(reqs)) => {
            let replies: Vec<String> = reqs.into_iter().map(|r| register_one(state, r)).collect();
            format!("[{}]", replies.join(","))
        }
        Err(e) => {
            let reply = JsonRpcErrorReply::new(Value::Null, INVALID_REQUEST, e.to_string());
            error!(chain_id, "rejected request: {}", reply.error.message);
            reply.to_json()
        }
    }
}

async fn dispatch_forward(state: &AppState, chain_id: u64, id: Value, body: &Value) -> String {
    match state.forwarder.forward(chain_id, body).await {
        Ok(response) => response,
        Err(e) => error_reply(chain_id, id, e),
    }
}

async fn dispatch_broadcast(
    state: &AppState,
    chain_id: u64,
    req: &JsonRpcRequest,
    body: &Value,
) -> String {
    match state.forwarder.broadcast(chain_id, body).await {
        Ok(response) => response,
        Err(e) => error_reply(chain_id, req.id.clone(), e),
    }
}

fn register_one(state: &AppState, req: RegisterRequest) -> String {
    let location = match req.rpc_location.parse() {
        Ok(location) => location,
        Err(e) => {
            let reply = JsonRpcErrorReply::new(Value::Null, INVALID_REQUEST, format!("{e}"));
            error!("rejected registration: {}", reply.error.message);
            return reply.to_json();
        }
    };

    let config = EndpointConfig::new(req.url, req.ws_url, req.chain_id, location);
    let message = match register_endpoint(&state.registry, config) {
        RegisterOutcome::Added => "endpoint registered",
        RegisterOutcome::AlreadyRegistered => "endpoint already registered",
    };
    JsonRpcResult::new(json!(1), message).to_json()
}

fn error_reply(chain_id: u64, id: Value, err: Error) -> String {
    let reply = match err {
        Error::Rpc(rpc_err) => JsonRpcErrorReply::from_rpc_error(id, &rpc_err),
        other => JsonRpcErrorReply::new(id, UPSTREAM_FAILED, other.to_string()),
    };
    error!(chain_id, "request failed: {}", reply.error.message);
    reply.to_json()
}
