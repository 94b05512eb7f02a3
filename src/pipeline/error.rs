use thiserror::Error;

use crate::evidence::EvidenceError;
use crate::fusion::FusionError;
use crate::media::MediaError;

/// Fatal outcomes of one analysis. Per-sample scoring failures never appear here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unsupported media format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("could not decode media: {reason}")]
    DecodeFailure { reason: String },

    #[error("no usable samples: {reason}")]
    NoUsableSamples { reason: String },

    #[error("analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl AnalysisError {
    /// Stable label for the error taxonomy.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFormat { .. } => "unsupported_format",
            AnalysisError::DecodeFailure { .. } => "decode_failure",
            AnalysisError::NoUsableSamples { .. } => "no_usable_samples",
            AnalysisError::AnalysisFailed { .. } => "analysis_failed",
            AnalysisError::Internal { .. } => "internal",
        }
    }

    /// Caller-facing message. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AnalysisError::UnsupportedFormat { extension } if extension.is_empty() => {
                "file has no recognizable media extension".to_string()
            }
            AnalysisError::UnsupportedFormat { extension } => {
                format!("unsupported media format '{extension}'")
            }
            AnalysisError::DecodeFailure { .. } => "media could not be decoded".to_string(),
            AnalysisError::NoUsableSamples { reason } => format!("no usable samples: {reason}"),
            AnalysisError::AnalysisFailed { .. } => {
                "no sample could be scored; try again later".to_string()
            }
            AnalysisError::Internal { .. } => "internal error".to_string(),
        }
    }
}

impl From<MediaError> for AnalysisError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedFormat { extension } => {
                AnalysisError::UnsupportedFormat { extension }
            }
            MediaError::DecodeFailure { reason } => AnalysisError::DecodeFailure { reason },
            MediaError::NoUsableSamples { reason } => AnalysisError::NoUsableSamples { reason },
            other => AnalysisError::Internal {
                reason: other.to_string(),
            },
        }
    }
}

impl From<EvidenceError> for AnalysisError {
    fn from(err: EvidenceError) -> Self {
        AnalysisError::Internal {
            reason: err.to_string(),
        }
    }
}

impl From<FusionError> for AnalysisError {
    fn from(err: FusionError) -> Self {
        match err {
            FusionError::NoScores => {
                AnalysisError::AnalysisFailed {
                    reason: err.to_string(),
                }
            }
            other => AnalysisError::Internal {
                reason: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Internal {
            reason: err.to_string(),
        }
    }
}
