//! Workspace orchestrator for the DataLab kernel.
//!
//! A [`Workspace`] gives uniform, named access to signals and images that
//! live either in process memory or in a remote peer. Exactly one backend
//! is active at a time:
//!
//! - `standalone` mode runs on the local store;
//! - `live` mode runs on the RPC proxy backend or the web API backend.
//!
//! [`Workspace::discover`] selects the backend from a [`KernelConfig`].
//! [`Workspace::resync`] and [`Workspace::connect`] move a standalone
//! workspace, entries included, onto a peer that became reachable later.

pub mod backend;
pub mod config;
pub mod connector;
pub mod error;
pub mod retry;
pub mod session;
pub mod workspace;

pub use backend::{Backend, RemoteChannel, WorkspaceMode};
pub use config::{
    KernelConfig, KernelMode, DEFAULT_PROXY_ADDR, ENV_MODE, ENV_PROXY_ADDR, ENV_WORKSPACE_TOKEN,
    ENV_WORKSPACE_URL,
};
pub use connector::{Connector, NetworkConnector};
pub use error::{KernelError, KernelResult};
pub use retry::RetryPolicy;
pub use session::{Session, KERNEL_VERSION};
pub use workspace::{Workspace, WorkspaceStatus};

// Re-export key types
pub use dlk_store::{BackendKind, StoreError};
pub use dlk_types::{DataObject, Grid, Image, ObjectKind, Roi, Signal};
