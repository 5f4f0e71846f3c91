//! Wire protocol for the DataLab kernel.
//!
//! Two transports reach a remote peer:
//!
//! - the **RPC channel**: length-prefixed bincode frames carrying
//!   [`ProxyRequest`] / [`ProxyResponse`], see [`FrameCodec`];
//! - the **web API**: JSON over HTTP under `/api/v1`, with object payloads
//!   shipped as array archives, see [`endpoints`] and [`payload`].

pub mod auth;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod payload;

pub use auth::{parse_bearer, AuthMethod};
pub use codec::{Frame, FrameCodec};
pub use endpoint::{
    endpoints, error_kinds, CalcRequest, CalcResponse, ErrorBody, ObjectListResponse,
    ObjectMetadata, OverwriteQuery, PathRequest, RenameRequest, StatusResponse,
    ARCHIVE_CONTENT_TYPE,
};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{codes, methods, ProxyRequest, ProxyResponse, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
pub use payload::{archive_to_object, object_to_archive};
