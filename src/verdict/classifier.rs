use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{
    BINARY_FAKE_THRESHOLD, FAKE_AVG_PERCENT, SUSPICIOUS_MAX_PERCENT, UNCERTAIN_MAX_PERCENT,
    to_display_percent,
};
use crate::fusion::{FusedResult, FusedScore};

use super::types::{DisplayHint, RichVerdict, RiskTier, Verdict};

/// Maps `(avg%, max%)` to a verdict. All comparisons are strict.
pub fn classify_rich(avg_percent: f64, max_percent: f64) -> RichVerdict {
    let (verdict, risk, hint) = if avg_percent > FAKE_AVG_PERCENT {
        (Verdict::Fake, RiskTier::Critical, DisplayHint::Red)
    } else if max_percent > SUSPICIOUS_MAX_PERCENT {
        (Verdict::Suspicious, RiskTier::High, DisplayHint::Orange)
    } else if max_percent > UNCERTAIN_MAX_PERCENT {
        (Verdict::Uncertain, RiskTier::Moderate, DisplayHint::Orange)
    } else {
        (Verdict::Authentic, RiskTier::Low, DisplayHint::Green)
    };
    RichVerdict {
        verdict,
        risk,
        hint,
    }
}

pub fn classify_binary(probability: f64) -> Verdict {
    if probability > BINARY_FAKE_THRESHOLD {
        Verdict::Fake
    } else {
        Verdict::Real
    }
}

/// Classified result with display-rounded percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Classification {
    Rich {
        verdict: Verdict,
        risk_level: RiskTier,
        color_code: DisplayHint,
        confidence_avg: f64,
        confidence_max: f64,
    },
    Binary {
        verdict: Verdict,
        confidence: f64,
        /// Per-branch mean percentage.
        details: BTreeMap<String, f64>,
    },
}

impl Classification {
    pub fn verdict(&self) -> Verdict {
        match self {
            Classification::Rich { verdict, .. } | Classification::Binary { verdict, .. } => {
                *verdict
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Picks the output mode from the fusion policy that produced `fused`.
    ///
    /// Thresholds see unrounded percentages; only the reported numbers are rounded.
    pub fn classify(&self, fused: &FusedResult) -> Classification {
        match &fused.score {
            FusedScore::MeanMax { mean, max } => {
                let rich = classify_rich(mean * 100.0, max * 100.0);
                Classification::Rich {
                    verdict: rich.verdict,
                    risk_level: rich.risk,
                    color_code: rich.hint,
                    confidence_avg: to_display_percent(*mean),
                    confidence_max: to_display_percent(*max),
                }
            }
            FusedScore::MaxOfMeans { probability, .. } => Classification::Binary {
                verdict: classify_binary(*probability),
                confidence: to_display_percent(*probability),
                details: fused
                    .branches
                    .iter()
                    .map(|b| (b.branch.clone(), to_display_percent(b.mean)))
                    .collect(),
            },
        }
    }
}
