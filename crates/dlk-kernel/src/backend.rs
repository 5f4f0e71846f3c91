use std::fmt;
use std::sync::Arc;

use dlk_proxy::{ProxyBackend, ProxyChannel};
use dlk_store::{BackendKind, LocalStore, WorkspaceBackend};
use dlk_webapi::{WebApiBackend, WebApiClient};
use serde::{Deserialize, Serialize};

/// Derived workspace mode: standalone iff the local store is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceMode {
    Standalone,
    Live,
}

impl WorkspaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for WorkspaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of backends a workspace can run on.
#[derive(Debug)]
pub enum Backend {
    Local(LocalStore),
    Proxy(ProxyBackend),
    WebApi(WebApiBackend),
}

impl Backend {
    pub fn local() -> Self {
        Self::Local(LocalStore::new())
    }

    pub fn as_dyn(&self) -> &dyn WorkspaceBackend {
        match self {
            Self::Local(b) => b,
            Self::Proxy(b) => b,
            Self::WebApi(b) => b,
        }
    }

    pub fn mode(&self) -> WorkspaceMode {
        match self {
            Self::Local(_) => WorkspaceMode::Standalone,
            Self::Proxy(_) | Self::WebApi(_) => WorkspaceMode::Live,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.as_dyn().kind()
    }

    /// Raw channel to the peer; `None` for the local store.
    pub fn remote_channel(&self) -> Option<RemoteChannel> {
        match self {
            Self::Local(_) => None,
            Self::Proxy(b) => Some(RemoteChannel::Rpc(b.channel())),
            Self::WebApi(b) => Some(RemoteChannel::Http(b.client())),
        }
    }
}

impl From<LocalStore> for Backend {
    fn from(store: LocalStore) -> Self {
        Self::Local(store)
    }
}

impl From<ProxyBackend> for Backend {
    fn from(backend: ProxyBackend) -> Self {
        Self::Proxy(backend)
    }
}

impl From<WebApiBackend> for Backend {
    fn from(backend: WebApiBackend) -> Self {
        Self::WebApi(backend)
    }
}

/// Direct access to a live peer for operations outside the workspace
/// contract.
#[derive(Clone)]
pub enum RemoteChannel {
    Rpc(Arc<dyn ProxyChannel>),
    Http(Arc<WebApiClient>),
}

impl RemoteChannel {
    pub fn endpoint(&self) -> String {
        match self {
            Self::Rpc(channel) => channel.endpoint(),
            Self::Http(client) => client.base_url().to_string(),
        }
    }

    pub fn as_rpc(&self) -> Option<&Arc<dyn ProxyChannel>> {
        match self {
            Self::Rpc(channel) => Some(channel),
            Self::Http(_) => None,
        }
    }

    pub fn as_http(&self) -> Option<&Arc<WebApiClient>> {
        match self {
            Self::Http(client) => Some(client),
            Self::Rpc(_) => None,
        }
    }
}

impl fmt::Debug for RemoteChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(channel) => f.debug_tuple("Rpc").field(&channel.endpoint()).finish(),
            Self::Http(client) => f.debug_tuple("Http").field(client).finish(),
        }
    }
}
