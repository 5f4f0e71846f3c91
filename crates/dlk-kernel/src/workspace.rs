use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use dlk_store::{BackendKind, StoreError};
use dlk_types::DataObject;
use dlk_webapi::WebApiConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{Backend, RemoteChannel, WorkspaceMode};
use crate::config::{KernelConfig, KernelMode, ENV_WORKSPACE_TOKEN, ENV_WORKSPACE_URL};
use crate::connector::{Connector, NetworkConnector};
use crate::error::{KernelError, KernelResult};
use crate::retry::RetryPolicy;

/// Snapshot returned by [`Workspace::status`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceStatus {
    pub mode: WorkspaceMode,
    pub backend: BackendKind,
    pub object_count: usize,
    /// Peer endpoint; absent for the local store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Named access to data objects on exactly one active backend.
///
/// Every public operation holds one lock on the active backend for its
/// whole duration, so [`resync`](Self::resync) and [`connect`](Self::connect)
/// never race with reads or writes.
pub struct Workspace {
    backend: Mutex<Backend>,
    connector: Arc<dyn Connector>,
    config: KernelConfig,
    retry: RetryPolicy,
}

impl Workspace {
    // ---- Construction ----

    /// Workspace on an explicit backend.
    pub fn new(backend: Backend) -> Self {
        let config = KernelConfig::default();
        Self {
            backend: Mutex::new(backend),
            connector: Arc::new(NetworkConnector::from_config(&config)),
            retry: config.retry_policy(),
            config,
        }
    }

    pub fn standalone() -> Self {
        Self::new(Backend::local())
    }

    /// Select a backend as configured, connecting over the network.
    pub fn discover(config: KernelConfig) -> KernelResult<Self> {
        let connector = Arc::new(NetworkConnector::from_config(&config));
        Self::discover_with(config, connector)
    }

    /// Select a backend in priority order:
    ///
    /// 1. forced standalone mode selects the local store;
    /// 2. a configured web API URL selects the web API backend;
    /// 3. a reachable RPC peer selects the RPC proxy backend;
    /// 4. otherwise the local store.
    ///
    /// In live mode a failed connection at step 2 or 3 fails construction
    /// instead of falling through.
    pub fn discover_with(config: KernelConfig, connector: Arc<dyn Connector>) -> KernelResult<Self> {
        let backend = Self::select(&config, connector.as_ref())?;
        info!(mode = %backend.mode(), backend = %backend.kind(), "workspace backend selected");
        Ok(Self {
            backend: Mutex::new(backend),
            retry: config.retry_policy(),
            connector,
            config,
        })
    }

    fn select(config: &KernelConfig, connector: &dyn Connector) -> KernelResult<Backend> {
        if config.mode == KernelMode::Standalone {
            return Ok(Backend::local());
        }

        if let Some(web) = config.web_api() {
            match connector.connect_web(&web) {
                Ok(backend) => return Ok(backend.into()),
                Err(e) if config.mode == KernelMode::Live => {
                    return Err(StoreError::Connection(format!(
                        "failed to connect to the web API at {}: {e}; check {ENV_WORKSPACE_URL} and {ENV_WORKSPACE_TOKEN}",
                        web.url
                    ))
                    .into());
                }
                Err(e) => warn!(url = %web.url, error = %e, "web api unavailable, trying the rpc peer"),
            }
        }

        match connector.connect_rpc() {
            Ok(backend) => Ok(backend.into()),
            Err(e) if config.mode == KernelMode::Live => Err(StoreError::Connection(format!(
                "failed to connect to the peer at {}: {e}",
                config.proxy_addr
            ))
            .into()),
            Err(e) => {
                debug!(addr = %config.proxy_addr, error = %e, "no rpc peer, running standalone");
                Ok(Backend::local())
            }
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().expect("lock poisoned")
    }

    // ---- State ----

    pub fn mode(&self) -> WorkspaceMode {
        self.lock().mode()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.lock().kind()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn status(&self) -> KernelResult<WorkspaceStatus> {
        let backend = self.lock();
        let active = backend.as_dyn();
        Ok(WorkspaceStatus {
            mode: backend.mode(),
            backend: active.kind(),
            object_count: active.list()?.len(),
            url: active.endpoint(),
        })
    }

    // ---- Entries ----

    pub fn list(&self) -> KernelResult<Vec<String>> {
        Ok(self.lock().as_dyn().list()?)
    }

    pub fn get(&self, name: &str) -> KernelResult<DataObject> {
        Ok(self.lock().as_dyn().get(name)?)
    }

    /// Store `object` under `name` and return it as stored.
    ///
    /// The read-back waits out a peer that acknowledges a write before its
    /// index shows it; see [`RetryPolicy`].
    pub fn add(&self, name: &str, object: DataObject, overwrite: bool) -> KernelResult<DataObject> {
        let backend = self.lock();
        let active = backend.as_dyn();
        active.add(name, object, overwrite)?;
        Ok(self.retry.wait_for(|| active.get(name))?)
    }

    pub fn remove(&self, name: &str) -> KernelResult<()> {
        Ok(self.lock().as_dyn().remove(name)?)
    }

    pub fn rename(&self, old: &str, new: &str) -> KernelResult<()> {
        Ok(self.lock().as_dyn().rename(old, new)?)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lock().as_dyn().exists(name)
    }

    pub fn clear(&self) -> KernelResult<()> {
        Ok(self.lock().as_dyn().clear()?)
    }

    pub fn save(&self, path: &Path) -> KernelResult<()> {
        Ok(self.lock().as_dyn().save(path)?)
    }

    pub fn load(&self, path: &Path) -> KernelResult<()> {
        Ok(self.lock().as_dyn().load(path)?)
    }

    pub fn len(&self) -> KernelResult<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> KernelResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exists(name)
    }

    pub fn names(&self) -> KernelResult<Vec<String>> {
        self.list()
    }

    // ---- Live mode ----

    /// Switch a standalone workspace to the RPC peer, copying every entry.
    ///
    /// Returns `false` when already live or when no peer answers.
    pub fn resync(&self) -> KernelResult<bool> {
        let mut backend = self.lock();
        if backend.mode() == WorkspaceMode::Live {
            return Ok(false);
        }
        let target = match self.connector.connect_rpc() {
            Ok(target) => target,
            Err(e) => {
                debug!(error = %e, "resync: no rpc peer");
                return Ok(false);
            }
        };
        Self::migrate(&mut backend, target.into())?;
        Ok(true)
    }

    /// Switch a standalone workspace to a web API peer, copying every
    /// entry. `url` and `token` default to the configured values.
    ///
    /// Returns `true` when already live, `false` when the peer cannot be
    /// reached.
    pub fn connect(&self, url: Option<&str>, token: Option<&str>) -> KernelResult<bool> {
        let mut backend = self.lock();
        if backend.mode() == WorkspaceMode::Live {
            return Ok(true);
        }
        let Some(web) = self.web_config(url, token) else {
            warn!("connect: no web API URL given and {ENV_WORKSPACE_URL} is not set");
            return Ok(false);
        };
        let target = match self.connector.connect_web(&web) {
            Ok(target) => target,
            Err(e) => {
                warn!(url = %web.url, error = %e, "connect: web api unavailable");
                return Ok(false);
            }
        };
        Self::migrate(&mut backend, target.into())?;
        Ok(true)
    }

    fn web_config(&self, url: Option<&str>, token: Option<&str>) -> Option<WebApiConfig> {
        let token = token.map(String::from);
        match url {
            Some(url) => Some(
                WebApiConfig::new(url)
                    .with_token(token)
                    .with_timeout(self.config.connect_timeout()),
            ),
            None => self.config.web_api().map(|web| match token {
                Some(token) => web.with_token(Some(token)),
                None => web,
            }),
        }
    }

    /// Copy every entry of `current` into `target` in name order, then make
    /// `target` active and shut the old backend down.
    ///
    /// A name already present on `target` stops the migration before
    /// anything is copied. On the first failing entry the entries already
    /// copied are removed from `target` again, `target` is shut down and
    /// `current` stays active and untouched. Copies `target` refuses to
    /// remove are reported in the error's `left_behind` list.
    fn migrate(current: &mut Backend, target: Backend) -> KernelResult<()> {
        let source = current.as_dyn();
        let dest = target.as_dyn();
        let mut names = source.list()?;
        names.sort();

        if let Some(taken) = names.iter().find(|name| dest.exists(name)) {
            dest.shutdown();
            warn!(name = %taken, "migration target already holds this name, staying standalone");
            return Err(KernelError::Migration {
                target: dest.kind().to_string(),
                name: taken.clone(),
                source: StoreError::AlreadyExists(taken.clone()),
                left_behind: Vec::new(),
            });
        }

        let mut copied: Vec<&str> = Vec::with_capacity(names.len());
        for name in &names {
            let outcome = source
                .get(name)
                .and_then(|object| dest.add(name, object, false));
            if let Err(source_err) = outcome {
                let mut left_behind = Vec::new();
                for done in copied.iter().rev() {
                    if let Err(e) = dest.remove(done) {
                        warn!(name = %done, error = %e, "rollback could not remove migrated entry");
                        left_behind.push(done.to_string());
                    }
                }
                left_behind.reverse();
                dest.shutdown();
                warn!(name = %name, error = %source_err, "migration failed, staying standalone");
                return Err(KernelError::Migration {
                    target: dest.kind().to_string(),
                    name: name.clone(),
                    source: source_err,
                    left_behind,
                });
            }
            copied.push(name);
        }

        let previous = std::mem::replace(current, target);
        previous.as_dyn().shutdown();
        info!(
            backend = %current.kind(),
            migrated = copied.len(),
            "workspace switched to live mode"
        );
        Ok(())
    }

    /// Run a named computation on the peer.
    pub fn calc(&self, name: &str, params: Option<&Value>) -> KernelResult<Option<Value>> {
        let backend = self.lock();
        if backend.mode() == WorkspaceMode::Standalone {
            return Err(KernelError::LiveModeRequired { operation: "calc" });
        }
        Ok(backend.as_dyn().calc(name, params)?)
    }

    /// Raw channel to the peer.
    pub fn proxy(&self) -> KernelResult<RemoteChannel> {
        self.lock()
            .remote_channel()
            .ok_or(KernelError::LiveModeRequired { operation: "proxy" })
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Ok(backend) = self.backend.get_mut() {
            backend.as_dyn().shutdown();
        }
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = self.mode();
        // a backend that cannot list shows as empty
        let names = self.names().unwrap_or_default();
        match names.len() {
            0 => write!(f, "Workspace({mode}, empty)"),
            1..=5 => write!(f, "Workspace({mode}, objects=[{}])", names.join(", ")),
            count => write!(
                f,
                "Workspace({mode}, objects=[{}, ...] ({count} total))",
                names[..5].join(", ")
            ),
        }
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("backend", &*self.lock())
            .field("retry", &self.retry)
            .finish()
    }
}
