use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported media format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("failed to decode media: {reason}")]
    DecodeFailure { reason: String },

    #[error("no usable samples: {reason}")]
    NoUsableSamples { reason: String },

    #[error("face localization unavailable: {reason}")]
    FaceLocatorUnavailable { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        MediaError::DecodeFailure {
            reason: err.to_string(),
        }
    }
}

pub type MediaResult<T> = Result<T, MediaError>;
