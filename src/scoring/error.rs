use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    /// Transient: backend unreachable, throttled, or timed out. Skip the sample.
    #[error("scoring unavailable: {reason}")]
    Unavailable { reason: String },

    /// The backend refused or failed on this input. Skip the sample.
    #[error("scoring rejected: {reason}")]
    Rejected { reason: String },

    #[error("failed to load scoring model: {reason}")]
    ModelLoadFailed { reason: String },
}

impl ScoringError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ScoringError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        ScoringError::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ScoringError::Unavailable { .. })
    }
}

impl From<candle_core::Error> for ScoringError {
    fn from(err: candle_core::Error) -> Self {
        ScoringError::Rejected {
            reason: format!("inference failed: {err}"),
        }
    }
}
