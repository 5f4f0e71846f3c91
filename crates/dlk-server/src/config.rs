use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use dlk_protocol::MAX_MESSAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_RPC_PORT: u16 = 8765;

/// Peer host settings. Every key is optional in the TOML form.
///
/// ```toml
/// http_addr = "127.0.0.1:8080"
/// rpc_addr = "127.0.0.1:8765"
/// token = "secret"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Web API listen address; `None` disables the web API.
    pub http_addr: Option<SocketAddr>,
    /// RPC channel listen address; `None` disables the RPC channel.
    pub rpc_addr: Option<SocketAddr>,
    /// Bearer token required on web API requests; `None` allows everyone.
    pub token: Option<String>,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: Some(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT))),
            rpc_addr: Some(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_RPC_PORT))),
            token: None,
            max_body_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
