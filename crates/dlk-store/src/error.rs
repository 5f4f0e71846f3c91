use std::path::PathBuf;

use dlk_pack::PackError;
use dlk_types::TypeError;

/// Errors shared by every workspace backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The name is absent. `available` lists the names present at the time.
    #[error("object '{name}' not found (available: {})", available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    /// The name is already taken and overwriting was not requested.
    #[error("object '{0}' already exists")]
    AlreadyExists(String),

    /// The backend or peer version cannot perform this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A live channel could not be established or verified.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The workspace file could not be encoded or decoded.
    #[error("persistence error: {0}")]
    Persistence(PackError),

    /// The remote peer reported a failure outside the taxonomy above.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("invalid object: {0}")]
    InvalidObject(#[from] TypeError),
}

impl StoreError {
    pub fn not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            available,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<PackError> for StoreError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Io(e) => Self::Io(e),
            PackError::InvalidObject(e) => Self::InvalidObject(e),
            other => Self::Persistence(other),
        }
    }
}

/// Result alias for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;
