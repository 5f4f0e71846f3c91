use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported workspace format version: {0}")]
    UnsupportedFormat(String),

    #[error("checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("corrupt data at offset {offset}: {reason}")]
    Corrupt { offset: usize, reason: String },

    #[error("invalid dataset {group}/{dataset}: {reason}")]
    InvalidDataset {
        group: String,
        dataset: String,
        reason: String,
    },

    #[error("missing dataset {group}/{dataset}")]
    MissingDataset { group: String, dataset: String },

    #[error("invalid object: {0}")]
    InvalidObject(#[from] dlk_types::TypeError),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = Result<T, PackError>;
