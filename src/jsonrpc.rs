//! JSON-RPC 2.0 wire types
//!
//! Request parsing for the two payload families the balancer accepts on
//! `POST /{chain_id}`: JSON-RPC calls (single or batch) and endpoint
//! registrations (single or batch). Replies are split into a result type and
//! an error type so a response can never carry both fields.

use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC parse error (malformed JSON body)
pub const PARSE_ERROR: i64 = -32700;
/// Invalid request (bad shape, missing chain id)
pub const INVALID_REQUEST: i64 = -32600;
/// No upstream endpoint produced a response
pub const UPSTREAM_FAILED: i64 = -32000;
/// No endpoints registered for the requested chain
pub const NO_ENDPOINTS: i64 = -32001;
/// Upstream request timed out
pub const UPSTREAM_TIMEOUT: i64 = -32002;
/// Upstream connection failed
pub const UPSTREAM_UNREACHABLE: i64 = -32003;

/// A single JSON-RPC 2.0 call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: Value,
}

/// Endpoint registration payload, as posted to `POST /{chain_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
    pub ws_url: String,
    pub chain_id: u64,
    pub rpc_location: String,
}

/// The request families accepted on the chain endpoint
#[derive(Debug)]
pub enum BalancerRequest {
    Call(JsonRpcRequest),
    CallBatch(Vec<JsonRpcRequest>),
    Register(RegisterRequest),
    RegisterBatch(Vec<RegisterRequest>),
}

impl BalancerRequest {
    /// Classify a parsed JSON body. Calls are tried before registrations so a
    /// JSON-RPC payload can never be mistaken for a registration.
    pub fn parse(value: &Value) -> Result<Self, RpcError> {
        if let Ok(req) = serde_json::from_value::<JsonRpcRequest>(value.clone()) {
            Ok(BalancerRequest::Call(req))
        } else if let Ok(reqs) = serde_json::from_value::<Vec<JsonRpcRequest>>(value.clone()) {
            Ok(BalancerRequest::CallBatch(reqs))
        } else if let Ok(req) = serde_json::from_value::<RegisterRequest>(value.clone()) {
            Ok(BalancerRequest::Register(req))
        } else if let Ok(reqs) = serde_json::from_value::<Vec<RegisterRequest>>(value.clone()) {
            Ok(BalancerRequest::RegisterBatch(reqs))
        } else {
            Err(RpcError::InvalidRequest(
                "unknown request shape".to_string(),
            ))
        }
    }
}

/// Successful JSON-RPC reply. Carries `result`, never `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResult {
    pub jsonrpc: String,
    pub id: Value,
    pub result: Value,
}

impl JsonRpcResult {
    pub fn new(id: Value, result: impl Into<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: result.into(),
        }
    }

    pub fn to_json(&self) -> String {
        json!({
            "jsonrpc": &self.jsonrpc,
            "id": &self.id,
            "result": &self.result,
        })
        .to_string()
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Failed JSON-RPC reply. Carries `error`, never `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorReply {
    pub jsonrpc: String,
    pub id: Value,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcErrorReply {
    pub fn new(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            error: JsonRpcErrorObject {
                code,
                message: message.into(),
            },
        }
    }

    /// Build a reply from a balancer-level failure
    pub fn from_rpc_error(id: Value, err: &RpcError) -> Self {
        let code = match err {
            RpcError::MissingChainId | RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::NoEndpointsForChain(_) => NO_ENDPOINTS,
            RpcError::Timeout => UPSTREAM_TIMEOUT,
            RpcError::ConnectionFailed(_) => UPSTREAM_UNREACHABLE,
            _ => UPSTREAM_FAILED,
        };
        Self::new(id, code, err.to_string())
    }

    pub fn to_json(&self) -> String {
        json!({
            "jsonrpc": &self.jsonrpc,
            "id": &self.id,
            "error": {
                "code": self.error.code,
                "message": &self.error.message,
            },
        })
        .to_string()
    }
}

/// Parse a `0x`-prefixed hex quantity into a block number
pub fn parse_hex_block(raw: &str) -> Result<u64, RpcError> {
    let trimmed = raw.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Err(RpcError::InvalidResponse(format!(
            "empty hex quantity: {raw:?}"
        )));
    }
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad hex quantity {raw:?}: {e}")))
}
