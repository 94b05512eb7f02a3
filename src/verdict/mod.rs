//! Verdict classification.
//!
//! Pure functions from fused probabilities to labels. Two output modes:
//! the rich mode (verdict, risk tier, display hint) when mean and max are both
//! available, and the binary FAKE/REAL mode for multi-branch fusion.

mod classifier;
mod types;

#[cfg(test)]
mod tests;

pub use classifier::{Classification, VerdictClassifier, classify_binary, classify_rich};
pub use types::{DisplayHint, RichVerdict, RiskTier, Verdict};
