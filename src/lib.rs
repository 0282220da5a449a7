//! rpc-balancer - Chain-keyed JSON-RPC load balancer
//!
//! An HTTP service that proxies JSON-RPC calls to the healthiest of the
//! registered upstream endpoints for a chain. Endpoints are registered over
//! HTTP (`POST /{chain_id}`) or seeded from a TOML config file; each one gets
//! a WebSocket `newHeads` watcher that keeps its head-of-chain state current.
//! Requests fail over down a strategy-ranked endpoint list, and raw
//! transactions are broadcast to every endpoint of the chain.
//!
//! # Example
//!
//! ```rust,no_run
//! use rpc_balancer::{AppState, Forwarder, Registry, Strategy};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(Registry::new(1000));
//!     let forwarder = Arc::new(Forwarder::new(
//!         registry.clone(),
//!         Strategy::MinLatency,
//!         Duration::from_secs(30),
//!     )?);
//!     let state = Arc::new(AppState { registry, forwarder });
//!
//!     rpc_balancer::serve("127.0.0.1:3003".parse()?, state).await?;
//!     Ok(())
//! }
//! ```

pub mod balance;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod proxy;
pub mod registry;
pub mod server;
pub mod watch;

// Re-exports for convenience
pub use balance::{rank_endpoints, Strategy};
pub use config::{ConfigFile, EndpointConfig, RpcLocation, Settings};
pub use error::{ConfigError, Error, Result, RpcError};
pub use jsonrpc::{BalancerRequest, JsonRpcErrorReply, JsonRpcRequest, JsonRpcResult};
pub use proxy::Forwarder;
pub use registry::{Endpoint, HeadState, RegisterOutcome, Registry, SampleWindow};
pub use server::{register_endpoint, router, serve, AppState};
