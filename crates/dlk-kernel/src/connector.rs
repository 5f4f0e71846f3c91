use std::sync::Arc;
use std::time::Duration;

use dlk_proxy::{ProxyBackend, TcpChannel};
use dlk_store::{StoreError, StoreResult};
use dlk_webapi::{WebApiBackend, WebApiConfig};

use crate::config::KernelConfig;

/// Produces remote backends for discovery and migration.
pub trait Connector: Send + Sync {
    /// Connect to the RPC peer.
    fn connect_rpc(&self) -> StoreResult<ProxyBackend>;

    /// Connect to a web API peer.
    fn connect_web(&self, config: &WebApiConfig) -> StoreResult<WebApiBackend>;
}

/// Connects over the network: TCP for the RPC channel, HTTP for the web API.
#[derive(Clone, Debug)]
pub struct NetworkConnector {
    proxy_addr: String,
    timeout: Duration,
}

impl NetworkConnector {
    pub fn new(proxy_addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            proxy_addr: proxy_addr.into(),
            timeout,
        }
    }

    pub fn from_config(config: &KernelConfig) -> Self {
        Self::new(config.proxy_addr.clone(), config.connect_timeout())
    }

    pub fn proxy_addr(&self) -> &str {
        &self.proxy_addr
    }
}

impl Connector for NetworkConnector {
    fn connect_rpc(&self) -> StoreResult<ProxyBackend> {
        let channel = TcpChannel::connect(&self.proxy_addr, self.timeout).map_err(|e| {
            StoreError::Connection(format!("no peer at {}: {e}", self.proxy_addr))
        })?;
        ProxyBackend::connect(Arc::new(channel))
    }

    fn connect_web(&self, config: &WebApiConfig) -> StoreResult<WebApiBackend> {
        WebApiBackend::connect(config)
    }
}
