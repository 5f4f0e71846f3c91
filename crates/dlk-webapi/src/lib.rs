//! HTTP web API backend for the DataLab kernel.
//!
//! [`WebApiBackend`] implements the workspace contract against a peer
//! serving the `/api/v1` endpoints of `dlk-protocol`. Requests go through
//! an [`HttpTransport`]; [`BlockingTransport`] (a blocking `reqwest`
//! client) is the default on native targets. Hosts without blocking
//! sockets plug in their own transport.
//!
//! HTTP statuses map onto the store error taxonomy:
//! 404 is `NotFound`, 409 `AlreadyExists`, 501 `Unsupported`, 401/403 and
//! transport failures `Connection`, anything else `Remote`.

pub mod backend;
pub mod client;
pub mod error;
pub mod transport;

pub use backend::WebApiBackend;
pub use client::{WebApiClient, WebApiConfig};
pub use error::{WebApiError, WebApiResult};
#[cfg(not(target_arch = "wasm32"))]
pub use transport::BlockingTransport;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
