use std::fmt;
use std::path::Path;

use dlk_types::DataObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Which concrete backend is behind a [`WorkspaceBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Local,
    RpcProxy,
    WebApi,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::RpcProxy => "rpc-proxy",
            Self::WebApi => "web-api",
        }
    }

    /// `true` for every backend that talks to a remote peer.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named storage of workspace objects.
///
/// Every backend honours the same contract:
/// - `get`, `remove` and `rename` fail with [`StoreError::NotFound`] when the
///   name is absent; the error carries the names currently present.
/// - `add` without `overwrite` and `rename` onto a taken name fail with
///   [`StoreError::AlreadyExists`].
/// - A stored object's title is set to its name.
/// - Operations a backend or peer cannot perform fail with
///   [`StoreError::Unsupported`], never a silent no-op.
///
/// Methods take `&self`; implementations lock internally.
pub trait WorkspaceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Remote URL or address, for status reporting.
    fn endpoint(&self) -> Option<String> {
        None
    }

    /// Names of all entries. Order is stable for one backend.
    fn list(&self) -> StoreResult<Vec<String>>;

    fn get(&self, name: &str) -> StoreResult<DataObject>;

    fn add(&self, name: &str, object: DataObject, overwrite: bool) -> StoreResult<()>;

    fn remove(&self, name: &str) -> StoreResult<()>;

    /// Move an entry to a new name, keeping its content and retitling it.
    fn rename(&self, old: &str, new: &str) -> StoreResult<()>;

    /// Never fails; unreachable backends report `false`.
    fn exists(&self, name: &str) -> bool;

    fn clear(&self) -> StoreResult<()>;

    fn save(&self, path: &Path) -> StoreResult<()>;

    fn load(&self, path: &Path) -> StoreResult<()>;

    /// Run a named computation on the backend.
    fn calc(&self, name: &str, params: Option<&Value>) -> StoreResult<Option<Value>> {
        let _ = params;
        Err(StoreError::Unsupported(format!(
            "calc '{name}' on {} backend",
            self.kind()
        )))
    }

    /// Release channel resources. Called once when the backend is replaced.
    fn shutdown(&self) {}
}
