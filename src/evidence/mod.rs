//! Chain of custody and temporary-resource tracking.
//!
//! Each pipeline invocation opens its own [`EvidenceLedger`], which:
//! - owns a uuid-named scratch directory under the configured scratch root
//! - computes a streaming digest of the original artifact
//! - records every temporary file or directory created on the invocation's behalf
//!
//! Pending handles are handed to [`crate::cleanup::CleanupScheduler`] at the end of the
//! run. A ledger dropped with handles still pending releases them synchronously.

pub mod digest;
pub mod error;
pub mod ledger;
pub mod resource;

#[cfg(test)]
mod tests;

pub use digest::{DigestAlgorithm, digest_file, digest_reader};
pub use error::{EvidenceError, EvidenceResult};
pub use ledger::{EvidenceLedger, EvidenceRecord};
pub use resource::{ReleaseOutcome, ResourceHandle};
