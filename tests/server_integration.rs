//! Router-level integration tests
//!
//! Exercises the balancer through its axum router: registration, proxying to
//! a mock upstream, and the JSON-RPC error surface.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use rpc_balancer::{AppState, Forwarder, Registry, Strategy};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

fn app_state(strategy: Strategy) -> Arc<AppState> {
    let registry = Arc::new(Registry::new(100));
    let forwarder = Arc::new(
        Forwarder::new(registry.clone(), strategy, Duration::from_secs(5)).unwrap(),
    );
    Arc::new(AppState {
        registry,
        forwarder,
    })
}

fn router(state: &Arc<AppState>) -> Router {
    rpc_balancer::router(state.clone())
}

async fn post_json(router: Router, path: &str, body: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_json(router: Router, path: &str) -> Value {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A response must carry `result` XOR `error`
fn assert_exclusive(reply: &Value) {
    assert_ne!(
        reply.get("result").is_some(),
        reply.get("error").is_some(),
        "reply must carry exactly one of result/error: {reply}"
    );
}

fn registration(url: &str, chain_id: u64) -> Value {
    json!({
        "url": url,
        // Unroutable port so the watcher fails fast in tests
        "ws_url": "ws://127.0.0.1:1/",
        "chain_id": chain_id,
        "rpc_location": "External",
    })
}

fn block_number_call() -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_blockNumber",
        "params": [],
        "id": 1,
    })
}

/// Start a mock upstream that answers every POST with a fixed JSON body
async fn spawn_upstream(response: &'static str) -> String {
    let app = Router::new().route(
        "/",
        post(move || async move { ([(header::CONTENT_TYPE, "application/json")], response) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// Start a mock upstream that answers every POST with HTTP 500
async fn spawn_failing_upstream() -> String {
    let app = Router::new().route(
        "/",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

// ==================== Path and body validation ====================

#[tokio::test]
async fn test_non_numeric_chain_id_is_rejected() {
    let state = app_state(Strategy::MinLatency);
    let reply = post_json(router(&state), "/optimism", block_number_call()).await;

    assert_exclusive(&reply);
    assert_eq!(reply["error"]["code"], -32600);
}

#[tokio::test]
async fn test_zero_chain_id_is_rejected() {
    let state = app_state(Strategy::MinLatency);
    let reply = post_json(router(&state), "/0", block_number_call()).await;

    assert_eq!(reply["error"]["code"], -32600);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let state = app_state(Strategy::MinLatency);
    let request = Request::builder()
        .method("POST")
        .uri("/10")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router(&state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let reply: Value = serde_json::from_slice(&bytes).unwrap();
    assert_exclusive(&reply);
    assert_eq!(reply["error"]["code"], -32700);
}

#[tokio::test]
async fn test_unknown_request_shape() {
    let state = app_state(Strategy::MinLatency);
    let reply = post_json(router(&state), "/10", json!({"hello": "world"})).await;

    assert_eq!(reply["error"]["code"], -32600);
}

// ==================== Registration ====================

#[tokio::test]
async fn test_register_endpoint() {
    let state = app_state(Strategy::MinLatency);
    let reply = post_json(
        router(&state),
        "/10",
        registration("http://127.0.0.1:1/rpc", 10),
    )
    .await;

    assert_exclusive(&reply);
    assert_eq!(reply["result"], "endpoint registered");
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_register_is_idempotent_on_url() {
    let state = app_state(Strategy::MinLatency);
    let body = registration("http://127.0.0.1:1/rpc", 10);

    let first = post_json(router(&state), "/10", body.clone()).await;
    assert_eq!(first["result"], "endpoint registered");

    let second = post_json(router(&state), "/10", body).await;
    assert_exclusive(&second);
    assert_eq!(second["result"], "endpoint already registered");
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_register_batch() {
    let state = app_state(Strategy::MinLatency);
    let body = json!([
        registration("http://127.0.0.1:1/a", 10),
        registration("http://127.0.0.1:1/b", 10),
    ]);

    let replies = post_json(router(&state), "/10", body).await;
    let replies = replies.as_array().expect("batch reply is an array");
    assert_eq!(replies.len(), 2);
    for reply in replies {
        assert_exclusive(reply);
        assert_eq!(reply["result"], "endpoint registered");
    }
    assert_eq!(state.registry.len(), 2);
}

#[tokio::test]
async fn test_register_invalid_location() {
    let state = app_state(Strategy::MinLatency);
    let body = json!({
        "url": "http://127.0.0.1:1/rpc",
        "ws_url": "ws://127.0.0.1:1/",
        "chain_id": 10,
        "rpc_location": "nearby",
    });

    let reply = post_json(router(&state), "/10", body).await;
    assert_exclusive(&reply);
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(state.registry.len(), 0);
}

#[tokio::test]
async fn test_endpoints_snapshot() {
    let state = app_state(Strategy::MinLatency);
    post_json(
        router(&state),
        "/10",
        registration("http://127.0.0.1:1/rpc", 10),
    )
    .await;

    let snapshot = get_json(router(&state), "/endpoints").await;
    let entries = snapshot.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["chain_id"], 10);
    assert_eq!(entries[0]["location"], "external");
    assert_eq!(entries[0]["last_block"], 0);
}

#[tokio::test]
async fn test_health() {
    let state = app_state(Strategy::MinLatency);
    let health = get_json(router(&state), "/health").await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["endpoints"], 0);
}

// ==================== Proxying ====================

#[tokio::test]
async fn test_call_without_endpoints() {
    let state = app_state(Strategy::MinLatency);
    let reply = post_json(router(&state), "/10", block_number_call()).await;

    assert_exclusive(&reply);
    assert_eq!(reply["error"]["code"], -32001);
}

#[tokio::test]
async fn test_call_routes_to_registered_endpoint() {
    let upstream = spawn_upstream(r#"{"jsonrpc":"2.0","id":1,"result":"0x6632be"}"#).await;

    let state = app_state(Strategy::MinLatency);
    post_json(router(&state), "/10", registration(&upstream, 10)).await;

    let reply = post_json(router(&state), "/10", block_number_call()).await;
    assert_exclusive(&reply);
    assert_eq!(reply["result"], "0x6632be");

    // The result is a valid hex block number
    let raw = reply["result"].as_str().unwrap();
    let block = u64::from_str_radix(raw.trim_start_matches("0x"), 16).unwrap();
    assert_eq!(block, 6_697_662);

    // The serving endpoint picked up a latency sample
    let snapshot = get_json(router(&state), "/endpoints").await;
    assert_eq!(snapshot[0]["requests_sampled"], 1);
}

#[tokio::test]
async fn test_call_for_other_chain_does_not_route() {
    let upstream = spawn_upstream(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).await;

    let state = app_state(Strategy::MinLatency);
    post_json(router(&state), "/10", registration(&upstream, 10)).await;

    // Chain 1 has no endpoints even though chain 10 does
    let reply = post_json(router(&state), "/1", block_number_call()).await;
    assert_eq!(reply["error"]["code"], -32001);
}

#[tokio::test]
async fn test_failover_to_working_endpoint() {
    let upstream = spawn_upstream(r#"{"jsonrpc":"2.0","id":1,"result":"0x2a"}"#).await;

    let state = app_state(Strategy::MinLatency);
    // Dead endpoint first, live endpoint second
    post_json(
        router(&state),
        "/10",
        registration("http://127.0.0.1:1/dead", 10),
    )
    .await;
    post_json(router(&state), "/10", registration(&upstream, 10)).await;

    let reply = post_json(router(&state), "/10", block_number_call()).await;
    assert_exclusive(&reply);
    assert_eq!(reply["result"], "0x2a");
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_connection_failure() {
    let state = app_state(Strategy::MinLatency);
    post_json(
        router(&state),
        "/10",
        registration("http://127.0.0.1:1/dead", 10),
    )
    .await;

    let reply = post_json(router(&state), "/10", block_number_call()).await;
    assert_exclusive(&reply);
    // Refused connections surface as unreachable, not as a generic failure
    assert_eq!(reply["error"]["code"], -32003);
}

#[tokio::test]
async fn test_upstream_server_error_reports_generic_failure() {
    let upstream = spawn_failing_upstream().await;

    let state = app_state(Strategy::MinLatency);
    post_json(router(&state), "/10", registration(&upstream, 10)).await;

    let reply = post_json(router(&state), "/10", block_number_call()).await;
    assert_exclusive(&reply);
    assert_eq!(reply["error"]["code"], -32000);
    assert!(reply["error"]["message"]
        .as_str()
        .unwrap()
        .contains("server error status: 500"));
}

#[tokio::test]
async fn test_raw_transaction_broadcast_returns_upstream_rejection() {
    // Upstream answers with a JSON-RPC error body; the broadcast should pass
    // it through rather than swallow it
    let upstream = spawn_upstream(
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
    )
    .await;

    let state = app_state(Strategy::MinLatency);
    post_json(router(&state), "/10", registration(&upstream, 10)).await;

    let call = json!({
        "jsonrpc": "2.0",
        "method": "eth_sendRawTransaction",
        "params": ["0xdeadbeef"],
        "id": 1,
    });
    let reply = post_json(router(&state), "/10", call).await;
    assert_exclusive(&reply);
    assert_eq!(reply["error"]["message"], "nonce too low");
}
