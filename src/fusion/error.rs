use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("no successful scores to fuse")]
    NoScores,

    #[error("{policy} fusion needs exactly one branch, got {branches}")]
    BranchCountMismatch { policy: &'static str, branches: usize },

    #[error("unknown fusion policy '{0}'")]
    UnknownPolicy(String),
}
