//! Peer host for the DataLab kernel.
//!
//! Serves one in-process peer ([`dlk_proxy::MemoryPeer`]) two ways:
//!
//! - the web API under `/api/v1` (axum), guarded by an [`AuthProvider`];
//! - the framed RPC channel (tokio TCP), see [`RpcServer`].
//!
//! This is the only async code in the workspace. The kernel reaches it
//! through the blocking clients in `dlk-proxy` and `dlk-webapi`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod rpc;
pub mod server;

pub use auth::{AllowAllAuth, AuthProvider, Credentials, Identity, TokenAuth};
pub use config::{ServerConfig, DEFAULT_HTTP_PORT, DEFAULT_RPC_PORT};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use rpc::RpcServer;
pub use server::PeerHost;
