use std::sync::Arc;

use tracing::{info, warn};

use crate::budget::SampleBudgeter;
use crate::cleanup::CleanupScheduler;
use crate::config::{Config, ScorerKind};
use crate::fusion::FusionEngine;
use crate::media::{FfmpegDecoder, HttpFaceLocator, MediaSampler};
use crate::scoring::{
    BranchRunner, LocalModelScorer, MockScorer, ScoringBranch, ScoringError, SightengineConfig,
    SightengineScorer,
};

use super::runner::Pipeline;

impl Pipeline {
    /// Wires every stage from a validated [`Config`] and spawns the cleanup worker.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self, ScoringError> {
        let decoder = Arc::new(
            FfmpegDecoder::new(&config.ffmpeg_path, &config.ffprobe_path)
                .with_stall_timeout(config.decode_stall_timeout()),
        );
        let mut sampler = MediaSampler::new(config.sampler_config(), decoder);
        if config.face_mode {
            if let Some(url) = &config.face_locator_url {
                sampler = sampler.with_face_locator(Arc::new(HttpFaceLocator::new(url)));
            }
        }

        let scoring = BranchRunner::new(build_branches(config)?)
            .with_timeout(config.scorer_timeout())
            .with_max_in_flight(config.max_in_flight);

        info!(
            branches = ?config.scorers,
            fusion = %config.fusion_policy(),
            max_samples = config.max_samples,
            "Pipeline assembled"
        );

        Ok(Self::new(
            config.pipeline_config(),
            sampler,
            SampleBudgeter::new(config.max_samples),
            scoring,
            FusionEngine::new(config.fusion_policy()),
            CleanupScheduler::spawn(),
        ))
    }
}

/// One branch per configured scorer, in configuration order.
pub fn build_branches(config: &Config) -> Result<Vec<ScoringBranch>, ScoringError> {
    let mut branches = Vec::with_capacity(config.scorers.len());
    for kind in &config.scorers {
        let branch = match kind {
            ScorerKind::Sightengine => {
                let (Some(user), Some(secret)) =
                    (&config.sightengine_user, &config.sightengine_secret)
                else {
                    return Err(ScoringError::unavailable(
                        "sightengine credentials are not configured",
                    ));
                };
                let remote = SightengineConfig::new(user, secret)
                    .with_url(&config.sightengine_url);
                ScoringBranch::new(kind.as_str(), Arc::new(SightengineScorer::new(remote)?))
            }
            ScorerKind::Local => {
                let Some(path) = &config.model_path else {
                    return Err(ScoringError::ModelLoadFailed {
                        reason: "no model path configured".to_string(),
                    });
                };
                let scorer = LocalModelScorer::load(path, config.device)?;
                let branch = ScoringBranch::new(kind.as_str(), Arc::new(scorer));
                match config.model_temperature {
                    Some(t) => branch.with_temperature(t),
                    None => branch,
                }
            }
            ScorerKind::Mock => {
                warn!(
                    score = config.mock_score,
                    "Mock scorer explicitly enabled; verdicts are synthetic"
                );
                ScoringBranch::new(kind.as_str(), Arc::new(MockScorer::constant(config.mock_score)))
            }
        };
        branches.push(branch);
    }
    Ok(branches)
}
