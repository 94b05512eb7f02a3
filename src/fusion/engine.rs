use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::scoring::{BranchScores, ScoreBoard};

use super::calibration::calibrate;
use super::error::FusionError;
use super::types::{BranchDetail, FusedResult, FusedScore, FusionPolicy};

#[derive(Debug, Clone, Copy)]
pub struct FusionEngine {
    policy: FusionPolicy,
}

impl FusionEngine {
    pub fn new(policy: FusionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    /// Combines the joined score board into one result.
    ///
    /// Branches with no usable scores do not vote. A record that cannot be calibrated
    /// (non-finite, or a probability outside `[0, 1]`) is dropped and counted as a
    /// rejection for its branch.
    pub fn fuse(&self, board: &ScoreBoard) -> Result<FusedResult, FusionError> {
        if self.policy == FusionPolicy::MeanMax && board.branches().len() != 1 {
            return Err(FusionError::BranchCountMismatch {
                policy: self.policy.label(),
                branches: board.branches().len(),
            });
        }

        let mut details = Vec::with_capacity(board.branches().len());
        let mut scored_ids = BTreeSet::new();

        for branch in board.branches() {
            let (usable, dropped) = calibrated(branch);
            scored_ids.extend(usable.iter().map(|(id, _)| *id));
            let probabilities: Vec<f64> = usable.into_iter().map(|(_, p)| p).collect();

            let Some(stats) = Stats::of(&probabilities) else {
                debug!(branch = %branch.branch, "Branch produced no scores");
                continue;
            };
            details.push(BranchDetail {
                branch: branch.branch.clone(),
                mean: stats.mean,
                max: stats.max,
                min: stats.min,
                samples_scored: probabilities.len(),
                failures: branch.failures() + dropped,
            });
        }

        let score = match self.policy {
            FusionPolicy::MeanMax => {
                let detail = details.first().ok_or(FusionError::NoScores)?;
                FusedScore::MeanMax {
                    mean: detail.mean,
                    max: detail.max,
                }
            }
            FusionPolicy::MaxOfMeans => {
                let leader = details
                    .iter()
                    .max_by(|a, b| a.mean.total_cmp(&b.mean))
                    .ok_or(FusionError::NoScores)?;
                FusedScore::MaxOfMeans {
                    probability: leader.mean,
                    leading_branch: leader.branch.clone(),
                }
            }
        };

        let result = FusedResult {
            score,
            samples_scored: scored_ids.len(),
            branches: details,
        };
        info!(
            policy = %self.policy,
            probability = result.probability(),
            samples_scored = result.samples_scored,
            "Fused scores"
        );
        Ok(result)
    }
}

/// Calibrated `(sample_id, probability)` pairs and the number of records dropped.
fn calibrated(branch: &BranchScores) -> (Vec<(usize, f64)>, usize) {
    let mut usable = Vec::with_capacity(branch.records.len());
    let mut dropped = 0;
    for record in &branch.records {
        match calibrate(record.raw, branch.temperature) {
            Some(p) => usable.push((record.sample_id, p)),
            None => {
                warn!(
                    branch = %branch.branch,
                    sample_id = record.sample_id,
                    raw = ?record.raw,
                    "Dropping unusable score"
                );
                dropped += 1;
            }
        }
    }
    (usable, dropped)
}

struct Stats {
    mean: f64,
    max: f64,
    min: f64,
}

impl Stats {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        // Summation error can push the mean a hair outside [min, max].
        let mean = (sum / values.len() as f64).clamp(min, max);
        Some(Self { mean, max, min })
    }
}
