use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::digest::{DigestAlgorithm, digest_file};
use super::error::{EvidenceError, EvidenceResult};
use super::resource::{ReleaseOutcome, ResourceHandle};

/// Per-invocation evidence state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceRecord {
    /// Hex digest of the original artifact, once computed.
    pub content_hash: Option<String>,
    /// Samples materialized during extraction.
    pub samples_created: usize,
    /// Handles still awaiting release, in creation order.
    pub pending: Vec<ResourceHandle>,
}

#[derive(Debug, Default)]
struct LedgerState {
    record: EvidenceRecord,
    settled: HashSet<ResourceHandle>,
}

/// Tracks the artifact digest and every temporary resource of one invocation.
#[derive(Debug)]
pub struct EvidenceLedger {
    invocation_id: Uuid,
    scratch_dir: PathBuf,
    algorithm: DigestAlgorithm,
    state: Mutex<LedgerState>,
}

impl EvidenceLedger {
    /// Creates `<scratch_root>/<uuid>` and tracks it.
    pub async fn open(scratch_root: &Path, algorithm: DigestAlgorithm) -> EvidenceResult<Self> {
        let invocation_id = Uuid::new_v4();
        let scratch_dir = scratch_root.join(invocation_id.to_string());

        tokio::fs::create_dir_all(&scratch_dir)
            .await
            .map_err(|source| EvidenceError::ScratchUnavailable {
                path: scratch_dir.clone(),
                source,
            })?;

        let ledger = Self {
            invocation_id,
            scratch_dir: scratch_dir.clone(),
            algorithm,
            state: Mutex::new(LedgerState::default()),
        };
        ledger.track(ResourceHandle::Directory(scratch_dir));

        debug!(invocation_id = %invocation_id, "Opened evidence ledger");
        Ok(ledger)
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Registers a handle for later release. Tracking the same handle twice is a no-op.
    pub fn track(&self, handle: ResourceHandle) {
        let mut state = self.state.lock();
        if state.settled.contains(&handle) || state.record.pending.contains(&handle) {
            return;
        }
        debug!(handle = %handle, "Tracking temporary resource");
        state.record.pending.push(handle);
    }

    /// Reserves a collision-free file path inside the scratch directory and tracks it.
    ///
    /// The file itself is not created.
    pub fn allocate_file(&self, extension: &str) -> PathBuf {
        let path = self
            .scratch_dir
            .join(format!("{}.{}", Uuid::new_v4(), extension));
        self.track(ResourceHandle::File(path.clone()));
        path
    }

    pub fn record_sample(&self) {
        self.state.lock().record.samples_created += 1;
    }

    /// Computes the streaming digest of `path` and stores it in the record.
    pub async fn hash_file(&self, path: &Path) -> EvidenceResult<String> {
        let path = path.to_path_buf();
        let algorithm = self.algorithm;
        let digest = tokio::task::spawn_blocking(move || digest_file(&path, algorithm))
            .await
            .map_err(|e| EvidenceError::TaskFailed(e.to_string()))??;

        self.state.lock().record.content_hash = Some(digest.clone());
        Ok(digest)
    }

    /// Releases one handle now.
    ///
    /// Idempotent: releasing an already-released or never-tracked handle returns
    /// `Ok` without touching the filesystem.
    pub async fn release(&self, handle: &ResourceHandle) -> EvidenceResult<ReleaseOutcome> {
        {
            let mut state = self.state.lock();
            if state.settled.contains(handle) {
                return Ok(ReleaseOutcome::AlreadyReleased);
            }
            let Some(pos) = state.record.pending.iter().position(|h| h == handle) else {
                return Ok(ReleaseOutcome::Untracked);
            };
            state.record.pending.remove(pos);
            state.settled.insert(handle.clone());
        }

        Ok(handle.release().await?)
    }

    /// Hands every pending handle to the caller, newest first, so files are removed
    /// before the directory that holds them.
    ///
    /// After this call the ledger considers those handles settled; the caller owns
    /// their release.
    pub fn take_pending(&self) -> Vec<ResourceHandle> {
        let mut state = self.state.lock();
        let mut handles = std::mem::take(&mut state.record.pending);
        for handle in &handles {
            state.settled.insert(handle.clone());
        }
        handles.reverse();
        handles
    }

    pub fn snapshot(&self) -> EvidenceRecord {
        self.state.lock().record.clone()
    }
}

impl Drop for EvidenceLedger {
    fn drop(&mut self) {
        let pending = std::mem::take(&mut self.state.get_mut().record.pending);
        if pending.is_empty() {
            return;
        }

        warn!(
            invocation_id = %self.invocation_id,
            count = pending.len(),
            "Evidence ledger dropped with pending resources, releasing inline"
        );
        for handle in pending.iter().rev() {
            if let Err(e) = handle.release_blocking() {
                warn!(handle = %handle, error = %e, "Failed to release resource on drop");
            }
        }
    }
}
