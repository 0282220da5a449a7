//! Balancer configuration

mod endpoint;
mod file;

pub use endpoint::{EndpointConfig, RpcLocation};
pub use file::{parse_listen_addr, ConfigFile, Settings, DEFAULT_PORT};
