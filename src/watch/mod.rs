//! Per-endpoint newHeads watcher
//!
//! One background task per registered endpoint keeps the registry's head
//! state current by subscribing to `eth_subscribe("newHeads")` over the
//! endpoint's WebSocket URL. Connection loss is handled with capped
//! exponential backoff; malformed notifications are skipped.

use crate::error::RpcError;
use crate::jsonrpc::parse_hex_block;
use crate::registry::{HeadState, Registry};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Spawn the watcher task for one endpoint. The task runs until the process
/// exits; the registry outlives every watcher.
pub fn spawn(registry: Arc<Registry>, url: String, ws_url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        run(registry, url, ws_url).await;
    })
}

async fn run(registry: Arc<Registry>, url: String, ws_url: String) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        info!(ws_url = %ws_url, "connecting newHeads watcher");
        match connect_async(ws_url.as_str()).await {
            Ok((ws_stream, _)) => {
                // Connected: a later stream failure starts backoff from scratch
                backoff = INITIAL_BACKOFF;
                match session(&registry, &url, &ws_url, ws_stream).await {
                    Ok(()) => warn!(ws_url = %ws_url, "newHeads stream ended, reconnecting"),
                    Err(e) => warn!(ws_url = %ws_url, error = %e, "watcher session failed"),
                }
            }
            Err(e) => {
                warn!(ws_url = %ws_url, error = %e, backoff_secs = backoff.as_secs(), "watcher connect failed");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// One subscribe-consume cycle on an established connection. Returns Ok when
/// the server closes the stream cleanly.
async fn session(
    registry: &Registry,
    url: &str,
    ws_url: &str,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<(), RpcError> {
    let (mut write, mut read) = ws_stream.split();

    let subscribe = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["newHeads"],
    })
    .to_string();
    write.send(Message::Text(subscribe.into())).await?;

    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let value: Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(ws_url, error = %e, "skipping malformed notification");
                        continue;
                    }
                };
                if let Some(head) = parse_new_head(&value) {
                    registry.update_head(url, head);
                }
            }
            Message::Ping(payload) => debug!(ws_url, ?payload, "ping"),
            Message::Close(_) => return Ok(()),
            other => debug!(ws_url, "ignoring non-text message: {:?}", other),
        }
    }

    Ok(())
}

/// Extract a head update from an `eth_subscription` notification. Returns
/// None for subscription acks and notifications missing the expected hex
/// fields.
fn parse_new_head(value: &Value) -> Option<HeadState> {
    if value.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        return None;
    }
    let result = value.get("params")?.get("result")?;

    let block = parse_hex_block(result.get("number")?.as_str()?).ok()?;
    let block_ts_secs = parse_hex_block(result.get("timestamp")?.as_str()?).ok()?;

    Some(HeadState {
        block,
        block_ts_ms: block_ts_secs * 1000,
        observed_at_ms: chrono::Utc::now().timestamp_millis() as u64,
    })
}
