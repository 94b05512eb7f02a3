use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// Never surfaced to callers; the verdict is already decided when this happens.
    #[error("failed to release {handle}: {source}")]
    CleanupFailure {
        handle: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown cleanup policy '{0}'")]
    UnknownPolicy(String),
}
