use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_SCORER_TIMEOUT_SECS};
use crate::media::SampleSet;

use super::error::ScoringError;
use super::scorer::Scorer;
use super::types::{BranchScores, RawScore, ScoreBoard, ScoreRecord};

/// A named scorer plus the calibration temperature applied to its output.
#[derive(Clone)]
pub struct ScoringBranch {
    name: String,
    scorer: Arc<dyn Scorer>,
    temperature: Option<f64>,
}

impl std::fmt::Debug for ScoringBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringBranch")
            .field("name", &self.name)
            .field("scorer", &self.scorer.name())
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ScoringBranch {
    pub fn new(name: impl Into<String>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            name: name.into(),
            scorer,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }
}

/// Runs every branch over every sample with bounded concurrency.
///
/// All calls are joined before returning. A call that exceeds `timeout` counts as
/// `Unavailable`; a panicking call counts as `Rejected`.
#[derive(Debug, Clone)]
pub struct BranchRunner {
    branches: Vec<ScoringBranch>,
    timeout: Duration,
    max_in_flight: usize,
}

impl BranchRunner {
    pub fn new(branches: Vec<ScoringBranch>) -> Self {
        Self {
            branches,
            timeout: Duration::from_secs(DEFAULT_SCORER_TIMEOUT_SECS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn branches(&self) -> &[ScoringBranch] {
        &self.branches
    }

    pub async fn score_all(&self, samples: &SampleSet) -> ScoreBoard {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut origins = HashMap::new();

        for (branch_idx, branch) in self.branches.iter().enumerate() {
            for sample in samples {
                let scorer = Arc::clone(&branch.scorer);
                let semaphore = Arc::clone(&semaphore);
                let sample = sample.clone();
                let timeout = self.timeout;
                let sample_id = sample.id();

                let handle = tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    match tokio::time::timeout(timeout, scorer.score(&sample)).await {
                        Ok(result) => result,
                        Err(_) => Err(ScoringError::unavailable(format!(
                            "timed out after {}ms",
                            timeout.as_millis()
                        ))),
                    }
                });
                origins.insert(handle.id(), (branch_idx, sample_id));
            }
        }

        let mut results: Vec<BranchScores> = self
            .branches
            .iter()
            .map(|b| BranchScores::new(&b.name).with_temperature(b.temperature))
            .collect();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (
                    e.id(),
                    Err(ScoringError::rejected(format!("scoring task failed: {e}"))),
                ),
            };
            let Some(&(branch_idx, sample_id)) = origins.get(&task_id) else {
                continue;
            };
            record_outcome(&mut results[branch_idx], sample_id, outcome);
        }

        for branch in &mut results {
            branch.records.sort_by_key(|r| r.sample_id);
            info!(
                branch = %branch.branch,
                scored = branch.records.len(),
                unavailable = branch.unavailable,
                rejected = branch.rejected,
                "Branch scoring complete"
            );
        }

        ScoreBoard::new(results)
    }
}

fn record_outcome(
    branch: &mut BranchScores,
    sample_id: usize,
    outcome: Result<RawScore, ScoringError>,
) {
    match outcome {
        Ok(raw) => {
            debug!(branch = %branch.branch, sample = sample_id, ?raw, "Sample scored");
            branch.records.push(ScoreRecord {
                sample_id,
                branch: branch.branch.clone(),
                raw,
            });
        }
        Err(e) => {
            warn!(branch = %branch.branch, sample = sample_id, error = %e, "Skipping sample");
            if e.is_unavailable() {
                branch.unavailable += 1;
            } else {
                branch.rejected += 1;
            }
        }
    }
}
