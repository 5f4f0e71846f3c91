use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dlk_protocol::{error_kinds, ErrorBody, ProtocolError};
use dlk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status and [`ErrorBody::error`] kind for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, error_kinds::UNAUTHORIZED),
            Self::BadRequest(_) | Self::Protocol(_) => {
                (StatusCode::BAD_REQUEST, error_kinds::BAD_REQUEST)
            }
            Self::Store(err) => match err {
                StoreError::NotFound { .. } | StoreError::FileNotFound(_) => {
                    (StatusCode::NOT_FOUND, error_kinds::NOT_FOUND)
                }
                StoreError::AlreadyExists(_) => (StatusCode::CONFLICT, error_kinds::ALREADY_EXISTS),
                StoreError::Unsupported(_) => {
                    (StatusCode::NOT_IMPLEMENTED, error_kinds::UNSUPPORTED)
                }
                StoreError::InvalidObject(_) => (StatusCode::BAD_REQUEST, error_kinds::BAD_REQUEST),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, error_kinds::INTERNAL),
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_kinds::INTERNAL)
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(ErrorBody::new(kind, self.to_string()))).into_response()
    }
}
