use std::sync::Arc;

use axum::Router;
use dlk_proxy::{MemoryPeer, ProxyBackend};
use tokio::net::TcpListener;
use tracing::info;

use crate::auth::{AllowAllAuth, AuthProvider, TokenAuth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;
use crate::rpc::RpcServer;

/// Hosts one [`MemoryPeer`] over the web API and the RPC channel.
///
/// Both transports share the peer, so an object added over one is visible
/// over the other.
pub struct PeerHost {
    config: ServerConfig,
    peer: Arc<MemoryPeer>,
    auth: Arc<dyn AuthProvider>,
}

impl PeerHost {
    pub fn new(config: ServerConfig) -> Self {
        let auth: Arc<dyn AuthProvider> = match &config.token {
            Some(token) => Arc::new(TokenAuth::new(token.clone())),
            None => Arc::new(AllowAllAuth),
        };
        Self {
            config,
            peer: Arc::new(MemoryPeer::new()),
            auth,
        }
    }

    pub fn with_peer(mut self, peer: Arc<MemoryPeer>) -> Self {
        self.peer = peer;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn peer(&self) -> Arc<MemoryPeer> {
        Arc::clone(&self.peer)
    }

    /// Build the web API router (useful for testing).
    pub fn router(&self) -> ServerResult<Router> {
        let backend = ProxyBackend::connect(self.peer.clone())?;
        let state = AppState::new(Arc::new(backend), Arc::clone(&self.auth));
        Ok(build_router(state, self.config.max_body_size))
    }

    /// Bind the configured addresses and serve until a listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        let http = match self.config.http_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };
        let rpc = match self.config.rpc_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };
        self.serve_on(http, rpc).await
    }

    /// Serve on already bound listeners.
    pub async fn serve_on(
        self,
        http: Option<TcpListener>,
        rpc: Option<TcpListener>,
    ) -> ServerResult<()> {
        if http.is_none() && rpc.is_none() {
            return Err(ServerError::Config(
                "neither the web API nor the RPC channel is enabled".into(),
            ));
        }
        let router = self.router()?;
        let auth = if self.config.token.is_some() { "bearer" } else { "none" };

        let peer = self.peer();

        let web = async move {
            match http {
                Some(listener) => serve_web(listener, router, auth).await,
                None => Ok(()),
            }
        };
        let channel = async move {
            match rpc {
                Some(listener) => RpcServer::new(peer).serve(listener).await,
                None => Ok(()),
            }
        };
        tokio::try_join!(web, channel)?;
        Ok(())
    }
}

async fn serve_web(listener: TcpListener, router: Router, auth: &'static str) -> ServerResult<()> {
    info!(addr = %listener.local_addr()?, auth, "web api listening");
    axum::serve(listener, router).await.map_err(ServerError::Io)
}

impl std::fmt::Debug for PeerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHost")
            .field("config", &self.config)
            .field("peer", &self.peer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_construction() {
        let host = PeerHost::new(ServerConfig::default());
        assert_eq!(host.config().rpc_addr, Some("127.0.0.1:8765".parse().unwrap()));
        assert_eq!(host.peer().object_count(), 0);
    }

    #[test]
    fn router_builds() {
        let host = PeerHost::new(ServerConfig::default());
        assert!(host.router().is_ok());
    }

    #[test]
    fn router_needs_live_peer() {
        let peer = Arc::new(MemoryPeer::new());
        peer.set_available(false);
        let host = PeerHost::new(ServerConfig::default()).with_peer(peer);
        assert!(matches!(host.router(), Err(ServerError::Store(_))));
    }

    #[tokio::test]
    async fn nothing_to_serve() {
        let host = PeerHost::new(ServerConfig::default());
        let err = host.serve_on(None, None).await.unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
