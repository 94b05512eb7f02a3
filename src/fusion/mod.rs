//! Score fusion.
//!
//! Raw branch scores are first calibrated to probabilities ([`calibrate`]), then
//! combined by one of two policies:
//!
//! - [`FusionPolicy::MeanMax`]: one branch, report mean and max over its samples
//! - [`FusionPolicy::MaxOfMeans`]: per-branch means, the highest one wins
//!
//! Everything stays at full `f64` precision; rounding is a presentation concern.

pub mod calibration;
pub mod engine;
pub mod error;
pub mod types;


pub use calibration::{calibrate, logit, sigmoid, two_class_softmax};
pub use engine::FusionEngine;
pub use error::FusionError;
pub use types::{BranchDetail, FusedResult, FusedScore, FusionPolicy};
