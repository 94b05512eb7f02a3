use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::FusionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionPolicy {
    /// Single branch: mean and max over its samples.
    MeanMax,
    /// Any number of branches: the highest per-branch mean.
    MaxOfMeans,
}

impl FusionPolicy {
    /// `MeanMax` for a single branch, `MaxOfMeans` otherwise.
    pub fn for_branch_count(branches: usize) -> Self {
        if branches == 1 {
            FusionPolicy::MeanMax
        } else {
            FusionPolicy::MaxOfMeans
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FusionPolicy::MeanMax => "mean-max",
            FusionPolicy::MaxOfMeans => "max-of-means",
        }
    }
}

impl fmt::Display for FusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FusionPolicy {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean-max" | "mean_max" => Ok(FusionPolicy::MeanMax),
            "max-of-means" | "max_of_means" => Ok(FusionPolicy::MaxOfMeans),
            other => Err(FusionError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Calibrated statistics for one branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchDetail {
    pub branch: String,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub samples_scored: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum FusedScore {
    MeanMax { mean: f64, max: f64 },
    MaxOfMeans { probability: f64, leading_branch: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub score: FusedScore,
    /// Distinct samples with at least one successful score.
    pub samples_scored: usize,
    pub branches: Vec<BranchDetail>,
}

impl FusedResult {
    pub fn policy(&self) -> FusionPolicy {
        match self.score {
            FusedScore::MeanMax { .. } => FusionPolicy::MeanMax,
            FusedScore::MaxOfMeans { .. } => FusionPolicy::MaxOfMeans,
        }
    }

    /// The single headline probability: the mean for `MeanMax`, the winning mean otherwise.
    pub fn probability(&self) -> f64 {
        match self.score {
            FusedScore::MeanMax { mean, .. } => mean,
            FusedScore::MaxOfMeans { probability, .. } => probability,
        }
    }
}
