//! Per-invocation orchestration.
//!
//! [`Pipeline`] wires the stages together for one artifact:
//!
//! ```text
//! artifact ─┬─> sample ─> budget ─> score (branches, concurrent) ─> fuse ─> classify
//!           └─> digest (concurrently with sampling)
//! ```
//!
//! Every resource the run creates is tracked in an
//! [`EvidenceLedger`](crate::evidence::EvidenceLedger) and handed to the
//! [`CleanupScheduler`](crate::cleanup::CleanupScheduler) on every exit path.

mod builder;
mod error;
mod report;
mod runner;


pub use builder::build_branches;
pub use error::AnalysisError;
pub use report::{AnalysisReport, AnalysisResponse};
pub use runner::{Pipeline, PipelineConfig};
