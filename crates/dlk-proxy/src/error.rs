use dlk_protocol::{codes, ProtocolError};
use dlk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The channel is closed or the peer did not answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with an error response.
    #[error("peer error: code={code}, message={message}")]
    Remote { code: u32, message: String },

    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid calc payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl From<ProxyError> for StoreError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Remote { code, message } => match code {
                codes::NOT_FOUND => StoreError::not_found(message, Vec::new()),
                codes::ALREADY_EXISTS => StoreError::AlreadyExists(message),
                codes::UNSUPPORTED => StoreError::Unsupported(message),
                _ => StoreError::Remote(format!("code {code}: {message}")),
            },
            ProxyError::UnexpectedResponse { .. } | ProxyError::InvalidJson(_) => {
                StoreError::Remote(err.to_string())
            }
            ProxyError::Transport(_) | ProxyError::Protocol(_) | ProxyError::Io(_) => {
                StoreError::Connection(err.to_string())
            }
        }
    }
}
