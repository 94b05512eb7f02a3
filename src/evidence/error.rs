use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create scratch directory {path}: {source}")]
    ScratchUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("digest task failed: {0}")]
    TaskFailed(String),
}

pub type EvidenceResult<T> = Result<T, EvidenceError>;
