//! Evidence cleanup.
//!
//! [`CleanupScheduler`] releases the resource handles an invocation tracked, either
//! before the result is returned ([`CleanupPolicy::Immediate`]) or on a background
//! worker after it ([`CleanupPolicy::Deferred`]). Jobs carry only handles, never live
//! pipeline state. Failures are logged and swallowed.

mod error;
mod scheduler;
mod types;

#[cfg(test)]
mod tests;

pub use error::CleanupError;
pub use scheduler::CleanupScheduler;
pub use types::{CleanupJob, CleanupPolicy, CleanupReport};
