//! RPC proxy backend for the DataLab kernel.
//!
//! [`ProxyBackend`] implements the workspace contract on top of a remote
//! peer that keeps signals and images in two panels. The peer is reached
//! through a [`ProxyChannel`]:
//!
//! - [`TcpChannel`] speaks the framed protocol of `dlk-protocol` over TCP;
//! - [`MemoryPeer`] is an in-process peer, used by tests and served by the
//!   peer host in `dlk-server`.
//!
//! Listing probes both panels and merges the results. A panel whose probe
//! fails contributes nothing (see [`PanelProbe`]).

pub mod backend;
pub mod channel;
pub mod error;
pub mod memory;
pub mod tcp;

pub use backend::ProxyBackend;
pub use channel::{PanelProbe, ProxyChannel};
pub use error::{ProxyError, ProxyResult};
pub use memory::{CalcHandler, MemoryPeer};
pub use tcp::TcpChannel;
