//! Scoring capability and its backends.
//!
//! A [`Scorer`] turns one [`Sample`](crate::media::Sample) into a [`RawScore`]:
//! either a calibrated probability or two-class logits that
//! [`FusionEngine`](crate::fusion::FusionEngine) calibrates later.
//!
//! Backends:
//! - [`SightengineScorer`]: remote API, JPEG upload, probability back
//! - [`LocalModelScorer`]: candle classifier head, logits back
//! - [`MockScorer`]: scripted responses for development and tests
//!
//! [`BranchRunner`] fans samples out across named branches concurrently, applies the
//! per-call timeout, and joins everything into a [`ScoreBoard`] before fusion.
//! Per-sample failures are counted, never fatal.

pub mod branch;
pub mod device;
pub mod error;
pub mod local;
pub mod mock;
pub mod remote;
pub mod scorer;
pub mod types;


pub use branch::{BranchRunner, ScoringBranch};
pub use device::{DevicePreference, select_device};
pub use error::ScoringError;
pub use local::{ImageClassifier, InferenceModel, LocalModelScorer, preprocess};
pub use mock::{MockResponse, MockScorer};
pub use remote::{DEFAULT_SIGHTENGINE_URL, SightengineConfig, SightengineScorer};
pub use scorer::Scorer;
pub use types::{BranchScores, RawScore, ScoreBoard, ScoreRecord};
