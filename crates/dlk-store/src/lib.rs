//! Workspace backends for the DataLab kernel.
//!
//! A workspace is a named collection of [`dlk_types::DataObject`] values.
//! Where the collection lives is a backend decision: in process memory, or
//! inside a remote application reached over RPC or HTTP. All backends
//! implement [`WorkspaceBackend`] and report failures through one error
//! taxonomy, [`StoreError`].
//!
//! This crate ships the capability trait and the in-process
//! [`LocalStore`]. Remote backends live in `dlk-proxy` and `dlk-webapi`.
//!
//! # Contract
//!
//! 1. Names are unique within one backend.
//! 2. A stored object's title equals its name.
//! 3. Missing names fail with `NotFound`, taken names with `AlreadyExists`.
//! 4. Unsupported operations fail loudly with `Unsupported`.
//! 5. `exists` never fails.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::LocalStore;
pub use traits::{BackendKind, WorkspaceBackend};
