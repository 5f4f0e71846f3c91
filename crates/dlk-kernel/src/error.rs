use dlk_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation needs a remote backend but the workspace is standalone.
    #[error("{operation}() is only available in live mode")]
    LiveModeRequired { operation: &'static str },

    /// Copying entries to a new backend failed; nothing was switched.
    /// `left_behind` names copies the target refused to remove again.
    #[error(
        "migration to {target} failed at entry '{name}': {source}{}",
        stranded(.left_behind)
    )]
    Migration {
        target: String,
        name: String,
        #[source]
        source: StoreError,
        left_behind: Vec<String>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl KernelError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

fn stranded(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" (left on the peer: {})", names.join(", "))
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
