use thiserror::Error;

/// Errors produced when building or converting object values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("shape mismatch for {field}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("unknown object kind: {0}")]
    UnknownKind(String),
}

pub type TypeResult<T> = Result<T, TypeError>;
