use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::budget::SampleBudgeter;
use crate::cleanup::{CleanupJob, CleanupPolicy, CleanupScheduler};
use crate::evidence::{DigestAlgorithm, EvidenceLedger, ResourceHandle};
use crate::fusion::FusionEngine;
use crate::media::{Artifact, MediaKind, MediaSampler};
use crate::scoring::BranchRunner;
use crate::verdict::VerdictClassifier;

use super::error::AnalysisError;
use super::report::AnalysisReport;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Each invocation gets its own `<scratch_root>/<uuid>` directory.
    pub scratch_root: PathBuf,
    pub digest: DigestAlgorithm,
    pub cleanup: CleanupPolicy,
}

impl PipelineConfig {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            digest: DigestAlgorithm::default(),
            cleanup: CleanupPolicy::default(),
        }
    }
}

/// Shared, immutable analysis context. Per-invocation state (scratch directory,
/// RNG, ledger) is created inside each call, so concurrent calls never share it.
pub struct Pipeline {
    config: PipelineConfig,
    sampler: MediaSampler,
    budgeter: SampleBudgeter,
    scoring: BranchRunner,
    fusion: FusionEngine,
    classifier: VerdictClassifier,
    cleanup: CleanupScheduler,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("sampler", &self.sampler)
            .field("max_samples", &self.budgeter.max_count())
            .field("branches", &self.scoring.branches().len())
            .field("fusion", &self.fusion.policy())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        sampler: MediaSampler,
        budgeter: SampleBudgeter,
        scoring: BranchRunner,
        fusion: FusionEngine,
        cleanup: CleanupScheduler,
    ) -> Self {
        Self {
            config,
            sampler: sampler.with_budget(budgeter),
            budgeter,
            scoring,
            fusion,
            classifier: VerdictClassifier,
            cleanup,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Analyzes uploaded bytes. The upload is written into the invocation's scratch
    /// directory and released with everything else the run created.
    #[tracing::instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn analyze_upload(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        let kind = MediaKind::from_filename(filename)?;
        let ledger = EvidenceLedger::open(&self.config.scratch_root, self.config.digest).await?;

        let result: Result<AnalysisReport, AnalysisError> = async {
            let path = ledger
                .scratch_dir()
                .join(format!("artifact.{}", stored_extension(filename)));
            ledger.track(ResourceHandle::File(path.clone()));
            tokio::fs::write(&path, bytes).await?;

            let artifact = Artifact::new(path, filename.to_string(), kind, bytes.len() as u64);
            self.run(&ledger, &artifact).await
        }
        .await;

        self.finish(&ledger, result).await
    }

    /// Analyzes a file already on disk. The file itself is left in place.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisReport, AnalysisError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact = Artifact::open(path, filename).await?;
        let ledger = EvidenceLedger::open(&self.config.scratch_root, self.config.digest).await?;

        let result = self.run(&ledger, &artifact).await;
        self.finish(&ledger, result).await
    }

    async fn run(
        &self,
        ledger: &EvidenceLedger,
        artifact: &Artifact,
    ) -> Result<AnalysisReport, AnalysisError> {
        let mut rng = StdRng::from_entropy();

        let (digest, extracted) = tokio::join!(
            ledger.hash_file(artifact.path()),
            self.sampler.extract(artifact, ledger, &mut rng),
        );
        let file_hash = digest?;
        let samples = extracted?;
        let samples_extracted = samples.candidates();

        // Padding repeats carry no new evidence; each frame is scored once.
        let budgeted = self.budgeter.limit(samples.distinct(), &mut rng);
        let board = self.scoring.score_all(&budgeted).await;
        if !board.has_scores() {
            return Err(AnalysisError::AnalysisFailed {
                reason: format!(
                    "all {} scoring calls failed across {} branches",
                    board.total_failures(),
                    board.branches().len()
                ),
            });
        }

        let fused = self.fusion.fuse(&board)?;
        let classification = self.classifier.classify(&fused);

        Ok(AnalysisReport {
            invocation_id: ledger.invocation_id(),
            filename: artifact.filename().to_string(),
            media_kind: artifact.kind(),
            file_hash,
            hash_algorithm: ledger.algorithm(),
            frames_analyzed: fused.samples_scored,
            samples_extracted,
            scorers: board.branches().iter().map(|b| b.branch.clone()).collect(),
            fusion: fused.policy(),
            classification,
            analyzed_at: Utc::now(),
        })
    }

    /// Hands every tracked resource to the cleanup scheduler, success or not.
    async fn finish(
        &self,
        ledger: &EvidenceLedger,
        result: Result<AnalysisReport, AnalysisError>,
    ) -> Result<AnalysisReport, AnalysisError> {
        match &result {
            Ok(report) => info!(
                invocation_id = %ledger.invocation_id(),
                verdict = %report.classification.verdict(),
                frames_analyzed = report.frames_analyzed,
                "Analysis complete"
            ),
            Err(e) => warn!(
                invocation_id = %ledger.invocation_id(),
                kind = e.kind(),
                error = %e,
                "Analysis failed"
            ),
        }

        let job = CleanupJob::new(ledger.invocation_id(), ledger.take_pending());
        self.cleanup.submit(job, self.config.cleanup).await;
        result
    }
}

/// Lowercased extension of the declared filename. Only alphanumerics survive.
fn stored_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}
