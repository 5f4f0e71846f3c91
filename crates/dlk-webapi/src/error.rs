use dlk_protocol::ProtocolError;
use dlk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebApiError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} ({error}): {message}")]
    Status {
        status: u16,
        error: String,
        message: String,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl WebApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type WebApiResult<T> = Result<T, WebApiError>;

impl From<WebApiError> for StoreError {
    fn from(err: WebApiError) -> Self {
        match err {
            WebApiError::Status { status, message, .. } => match status {
                404 => StoreError::not_found(message, Vec::new()),
                409 => StoreError::AlreadyExists(message),
                501 => StoreError::Unsupported(message),
                401 | 403 => StoreError::Connection(format!("HTTP {status}: {message}")),
                _ => StoreError::Remote(format!("HTTP {status}: {message}")),
            },
            WebApiError::Transport(_) | WebApiError::InvalidUrl(_) => {
                StoreError::Connection(err.to_string())
            }
            WebApiError::Json(_) | WebApiError::Protocol(_) => StoreError::Remote(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> WebApiError {
        WebApiError::Status {
            status: code,
            error: "x".into(),
            message: "m".into(),
        }
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(StoreError::from(status(404)).is_not_found());
        assert!(matches!(StoreError::from(status(409)), StoreError::AlreadyExists(_)));
        assert!(matches!(StoreError::from(status(501)), StoreError::Unsupported(_)));
        assert!(matches!(StoreError::from(status(401)), StoreError::Connection(_)));
        assert!(matches!(StoreError::from(status(403)), StoreError::Connection(_)));
        assert!(matches!(StoreError::from(status(500)), StoreError::Remote(_)));
    }

    #[test]
    fn transport_failure_is_connection_error() {
        let err: StoreError = WebApiError::Transport("refused".into()).into();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
