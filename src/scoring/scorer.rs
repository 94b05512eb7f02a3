use async_trait::async_trait;

use crate::media::Sample;

use super::error::ScoringError;
use super::types::RawScore;

#[async_trait]
/// Scores one sample. Implementations hold only immutable shared state; each call
/// is independent.
pub trait Scorer: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Returns the backend's raw output for `sample`.
    ///
    /// `Unavailable` and `Rejected` both mean "skip this sample"; neither aborts the run.
    async fn score(&self, sample: &Sample) -> Result<RawScore, ScoringError>;
}
