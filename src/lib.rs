//! Lucid library crate (used by the server binary and integration tests).
//!
//! Scores uploaded images and videos for signs of synthetic generation and
//! returns a verdict with a cryptographic fingerprint of the evidence.
//!
//! # Public API Surface
//!
//! ## Orchestration
//! - [`Pipeline`], [`PipelineConfig`] - One analysis per call, safe to share
//! - [`AnalysisReport`], [`AnalysisResponse`], [`AnalysisError`] - Results
//! - [`Config`], [`ConfigError`] - Environment-driven configuration
//!
//! ## Stages
//! - [`MediaSampler`] - Frame selection, decoding, optional face crops
//! - [`SampleBudgeter`] - Caps the samples forwarded to scoring
//! - [`Scorer`], [`BranchRunner`] - Concurrent scoring across branches
//! - [`FusionEngine`] - Calibrates and aggregates per-sample scores
//! - [`VerdictClassifier`] - Maps fused scores to verdict labels
//! - [`EvidenceLedger`], [`CleanupScheduler`] - Fingerprints and scratch lifecycle
//!
//! ## Test/Mock Support
//! Mock decoders and face locators are available behind
//! `#[cfg(any(test, feature = "mock"))]`. [`MockScorer`] is always built since it
//! doubles as the `mock` scoring backend, which is only used when `LUCID_SCORERS`
//! names it.

pub mod budget;
pub mod cleanup;
pub mod config;
pub mod constants;
pub mod evidence;
pub mod fusion;
pub mod gateway;
pub mod media;
pub mod pipeline;
pub mod scoring;
pub mod verdict;

pub use budget::SampleBudgeter;
pub use cleanup::{CleanupError, CleanupJob, CleanupPolicy, CleanupReport, CleanupScheduler};
pub use config::{Config, ConfigError, SamplingMode, ScorerKind};
pub use evidence::{DigestAlgorithm, EvidenceError, EvidenceLedger, ResourceHandle};
pub use fusion::{FusedResult, FusionEngine, FusionError, FusionPolicy};
pub use gateway::{HandlerState, create_router_with_state};
pub use media::{
    Artifact, FaceLocator, FfmpegDecoder, HttpFaceLocator, MediaError, MediaKind, MediaSampler,
    Sample, SampleSet, SamplerConfig, SamplingStrategy, VideoDecoder,
};
#[cfg(any(test, feature = "mock"))]
pub use media::{MockFaceLocator, MockVideoDecoder};
pub use pipeline::{AnalysisError, AnalysisReport, AnalysisResponse, Pipeline, PipelineConfig};
pub use scoring::{
    BranchRunner, LocalModelScorer, MockResponse, MockScorer, RawScore, ScoreBoard, Scorer,
    ScoringBranch, ScoringError, SightengineScorer,
};
pub use verdict::{Classification, RiskTier, Verdict, VerdictClassifier};
