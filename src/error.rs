use std::path::PathBuf;
use thiserror::Error;

/// Errors from the fallible edges of the crate (loading files, CLI guards).
/// Reconciliation itself never fails.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Cue string that is not `h:mm:ss`, `m:ss` or plain seconds
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    #[error("Safety check failed: {0}")]
    UnsafeOutput(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
