//! Error types for rpc-balancer

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC-related errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// RPC-specific errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("No endpoints registered for chain {0}")]
    NoEndpointsForChain(u64),

    #[error("No endpoint responded successfully")]
    AllEndpointsFailed,

    #[error("Chain id missing from request path (expected e.g. /10)")]
    MissingChainId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request to upstream endpoint timed out")]
    Timeout,

    #[error("Upstream connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Upstream returned client error status: {0}")]
    UpstreamBadRequest(u16),

    #[error("Upstream returned server error status: {0}")]
    UpstreamServerError(u16),

    #[error("Invalid response from endpoint: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Invalid endpoint location: {0}")]
    InvalidLocation(String),

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
