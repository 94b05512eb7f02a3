use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::evidence::DigestAlgorithm;
use crate::fusion::FusionPolicy;
use crate::media::MediaKind;
use crate::verdict::Classification;

use super::error::AnalysisError;

const RULE: &str = "==================================================";

/// Successful analysis of one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub invocation_id: Uuid,
    pub filename: String,
    pub media_kind: MediaKind,
    /// Chain-of-custody digest of the original bytes, lowercase hex.
    pub file_hash: String,
    pub hash_algorithm: DigestAlgorithm,
    /// Distinct frames that received at least one usable score. Face-mode padding
    /// repeats are not counted.
    pub frames_analyzed: usize,
    /// Frames the sampling strategy selected, before budgeting and face filtering.
    pub samples_extracted: usize,
    /// Names of the scoring branches that produced the verdict.
    pub scorers: Vec<String>,
    pub fusion: FusionPolicy,
    #[serde(flatten)]
    pub classification: Classification,
    pub analyzed_at: DateTime<Utc>,
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, " FORENSIC ANALYSIS REPORT")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, " File:            {}", self.filename)?;
        writeln!(f, " Frames scanned:  {}", self.frames_analyzed)?;
        writeln!(f, " Scorers:         {}", self.scorers.join(", "))?;

        match &self.classification {
            Classification::Rich {
                verdict,
                risk_level,
                confidence_avg,
                confidence_max,
                ..
            } => {
                writeln!(f, " Average score:   {confidence_avg:.2}%")?;
                writeln!(f, " Peak score:      {confidence_max:.2}%")?;
                writeln!(f, " Risk level:      {risk_level}")?;
                writeln!(f, " Verdict:         {verdict}")?;
            }
            Classification::Binary {
                verdict,
                confidence,
                details,
            } => {
                writeln!(f, " Confidence:      {confidence:.2}%")?;
                for (branch, percent) in details {
                    writeln!(f, "   {branch:<14} {percent:.2}%")?;
                }
                writeln!(f, " Verdict:         {verdict}")?;
            }
        }

        writeln!(f, " Fingerprint:     {}:{}", self.hash_algorithm, self.file_hash)?;
        write!(f, "{RULE}")
    }
}

/// Wire shape of an analysis outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisResponse {
    Success(AnalysisReport),
    Error { kind: &'static str, message: String },
}

impl From<Result<AnalysisReport, AnalysisError>> for AnalysisResponse {
    fn from(result: Result<AnalysisReport, AnalysisError>) -> Self {
        match result {
            Ok(report) => AnalysisResponse::Success(report),
            Err(err) => AnalysisResponse::from(&err),
        }
    }
}

impl From<&AnalysisError> for AnalysisResponse {
    fn from(err: &AnalysisError) -> Self {
        AnalysisResponse::Error {
            kind: err.kind(),
            message: err.public_message(),
        }
    }
}
