use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::evidence::ResourceHandle;

use super::error::CleanupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Release before the result is returned.
    Immediate,
    /// Hand off to the background worker; the caller does not wait.
    #[default]
    Deferred,
}

impl CleanupPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            CleanupPolicy::Immediate => "immediate",
            CleanupPolicy::Deferred => "deferred",
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CleanupPolicy {
    type Err = CleanupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" | "sync" => Ok(CleanupPolicy::Immediate),
            "deferred" | "background" => Ok(CleanupPolicy::Deferred),
            other => Err(CleanupError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Handles to release for one invocation, in release order.
#[derive(Debug, Clone)]
pub struct CleanupJob {
    pub invocation_id: Uuid,
    pub handles: Vec<ResourceHandle>,
}

impl CleanupJob {
    pub fn new(invocation_id: Uuid, handles: Vec<ResourceHandle>) -> Self {
        Self {
            invocation_id,
            handles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub released: usize,
    /// Already gone when the job ran.
    pub missing: usize,
    pub failed: usize,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
