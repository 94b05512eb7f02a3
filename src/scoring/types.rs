use serde::Serialize;

/// What a backend reported for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RawScore {
    /// Probability in `[0, 1]` that the sample is synthetic.
    Probability { value: f64 },
    /// Uncalibrated two-class logits.
    Logits { real: f64, fake: f64 },
}

impl RawScore {
    pub fn probability(value: f64) -> Self {
        RawScore::Probability { value }
    }

    pub fn logits(real: f64, fake: f64) -> Self {
        RawScore::Logits { real, fake }
    }
}

/// One branch's score for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub sample_id: usize,
    pub branch: String,
    pub raw: RawScore,
}

/// Everything one branch produced for the budgeted sample set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchScores {
    pub branch: String,
    /// Calibration temperature fusion applies to this branch's raw scores.
    pub temperature: Option<f64>,
    /// Successful scores, ordered by sample id.
    pub records: Vec<ScoreRecord>,
    pub unavailable: usize,
    pub rejected: usize,
}

impl BranchScores {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn failures(&self) -> usize {
        self.unavailable + self.rejected
    }
}

/// Complete scoring output for one invocation, in branch configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBoard {
    branches: Vec<BranchScores>,
}

impl ScoreBoard {
    pub fn new(branches: Vec<BranchScores>) -> Self {
        Self { branches }
    }

    pub fn branches(&self) -> &[BranchScores] {
        &self.branches
    }

    /// Successful records across all branches.
    pub fn total_scored(&self) -> usize {
        self.branches.iter().map(|b| b.records.len()).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.branches.iter().map(BranchScores::failures).sum()
    }

    pub fn has_scores(&self) -> bool {
        self.total_scored() > 0
    }
}
