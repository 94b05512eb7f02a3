use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::budget::SampleBudgeter;
use crate::constants::DEFAULT_SEQUENCE_LENGTH;
use crate::evidence::EvidenceLedger;

use super::decoder::{DecodedFrame, FrameSelection, VideoDecoder, VideoInfo};
use super::error::{MediaError, MediaResult};
use super::face::{FaceLocator, crop_to_box, largest_box};
use super::strategy::{SamplingStrategy, UniformPolicy, even_indices, per_second_step, random_indices};
use super::types::{Artifact, MediaKind, Provenance, Sample, SampleSet};

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Frame selection for videos.
    pub strategy: SamplingStrategy,
    /// Face mode pads non-empty sets up to this length by repeating the last sample.
    /// The padding is only for sequence consumers; repeats are never scored.
    pub sequence_length: usize,
    /// Write each sample as a JPEG into the invocation's scratch directory.
    pub materialize: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::default(),
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            materialize: true,
        }
    }
}

/// Extracts representative samples from an artifact.
pub struct MediaSampler {
    config: SamplerConfig,
    decoder: Arc<dyn VideoDecoder>,
    face_locator: Option<Arc<dyn FaceLocator>>,
    budget: Option<SampleBudgeter>,
}

impl std::fmt::Debug for MediaSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSampler")
            .field("config", &self.config)
            .field("face_mode", &self.is_face_mode())
            .field("budget", &self.budget.map(|b| b.max_count()))
            .finish()
    }
}

impl MediaSampler {
    pub fn new(config: SamplerConfig, decoder: Arc<dyn VideoDecoder>) -> Self {
        Self {
            config,
            decoder,
            face_locator: None,
            budget: None,
        }
    }

    /// Enables face-localized sampling.
    pub fn with_face_locator(mut self, locator: Arc<dyn FaceLocator>) -> Self {
        self.face_locator = Some(locator);
        self
    }

    /// Applies `budget` to candidate frame indices before decoding. Face mode ignores
    /// it, since frames without a face are only known after decoding.
    pub fn with_budget(mut self, budget: SampleBudgeter) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn is_face_mode(&self) -> bool {
        self.face_locator.is_some()
    }

    /// Produces the sample set for `artifact`.
    ///
    /// Fails with `DecodeFailure` when the artifact cannot be read or reports no
    /// frames, and with `NoUsableSamples` instead of returning an empty set.
    pub async fn extract<R: Rng + Send>(
        &self,
        artifact: &Artifact,
        ledger: &EvidenceLedger,
        rng: &mut R,
    ) -> MediaResult<SampleSet> {
        let (mut samples, candidates) = match artifact.kind() {
            MediaKind::Image => {
                let still = self.decode_still(artifact).await?;
                (vec![self.materialize(still, ledger).await?], 1)
            }
            MediaKind::Video => self.extract_video(artifact, ledger, rng).await?,
        };

        if samples.is_empty() {
            let reason = if self.is_face_mode() {
                "no face detected in any sampled frame"
            } else {
                "decoder produced no frames"
            };
            return Err(MediaError::NoUsableSamples {
                reason: reason.to_string(),
            });
        }

        let distinct = samples.len();
        if self.is_face_mode() && artifact.kind() == MediaKind::Video {
            pad_by_repeat(&mut samples, self.config.sequence_length);
        }

        info!(
            filename = artifact.filename(),
            kind = ?artifact.kind(),
            strategy = self.config.strategy.label(),
            candidates = candidates,
            distinct = distinct,
            samples = samples.len(),
            "Extracted samples"
        );
        Ok(SampleSet::new(samples).with_candidates(candidates))
    }

    async fn decode_still(&self, artifact: &Artifact) -> MediaResult<Sample> {
        let bytes = tokio::fs::read(artifact.path()).await?;
        let pixels = tokio::task::spawn_blocking(move || {
            image::load_from_memory(&bytes).map(|img| img.to_rgb8())
        })
        .await
        .map_err(|e| MediaError::DecodeFailure {
            reason: e.to_string(),
        })??;

        Ok(Sample::new(0, Provenance::frame(0), pixels))
    }

    /// Decodes the planned frames one at a time. Each frame is cropped and written out
    /// as soon as it arrives, so only the kept samples stay in memory.
    async fn extract_video<R: Rng + Send>(
        &self,
        artifact: &Artifact,
        ledger: &EvidenceLedger,
        rng: &mut R,
    ) -> MediaResult<(Vec<Sample>, usize)> {
        let info = self.decoder.probe(artifact.path()).await?;
        if info.total_frames == 0 {
            return Err(MediaError::DecodeFailure {
                reason: "video reports zero frames".to_string(),
            });
        }

        let (selection, candidates) = self.plan(&info, rng);
        let mut frames = self
            .decoder
            .stream_frames(artifact.path(), &info, selection)
            .await?;

        let mut samples = Vec::new();
        while let Some(frame) = frames.recv().await {
            if let Some(sample) = self.frame_to_sample(&info, frame?, samples.len()).await {
                samples.push(self.materialize(sample, ledger).await?);
            }
        }

        Ok((samples, candidates))
    }

    /// Chooses the frames to decode and counts the candidates the strategy selected.
    fn plan<R: Rng + ?Sized>(&self, info: &VideoInfo, rng: &mut R) -> (FrameSelection, usize) {
        let total = info.total_frames;
        let prebudget = self.budget.filter(|_| !self.is_face_mode());

        match self.config.strategy {
            SamplingStrategy::Uniform { count, policy } => {
                let k = count.resolve(total);
                let indices = match policy {
                    UniformPolicy::Even => even_indices(total, k),
                    UniformPolicy::Random => random_indices(total, k, rng),
                };
                let candidates = indices.len();
                let indices = match prebudget {
                    Some(budget) => budget.select(indices, rng),
                    None => indices,
                };
                debug!(
                    total_frames = total,
                    requested = k,
                    indices = ?indices,
                    "Selected frame indices"
                );
                (FrameSelection::Indices(indices), candidates)
            }
            SamplingStrategy::PerSecond => {
                let step = per_second_step(info.fps);
                let candidates = total.div_ceil(step) as usize;
                match prebudget {
                    Some(budget) if candidates > budget.max_count() => {
                        let all = (0..total).step_by(step as usize).collect();
                        let indices = budget.select(all, rng);
                        debug!(
                            fps = info.fps,
                            step = step,
                            indices = ?indices,
                            "Selected per-second frames within budget"
                        );
                        (FrameSelection::Indices(indices), candidates)
                    }
                    _ => {
                        debug!(fps = info.fps, step = step, "Decoding one frame per second");
                        (FrameSelection::Stride(step), candidates)
                    }
                }
            }
        }
    }

    async fn frame_to_sample(
        &self,
        info: &VideoInfo,
        frame: DecodedFrame,
        id: usize,
    ) -> Option<Sample> {
        let mut provenance = Provenance::frame(frame.index);
        if info.fps > 0.0 {
            provenance.timestamp_secs = Some(frame.index as f64 / info.fps);
        }

        let pixels = match &self.face_locator {
            None => frame.image,
            Some(locator) => {
                let (crop, bbox) = face_crop(locator.as_ref(), &frame).await?;
                provenance.bbox = Some(bbox);
                crop
            }
        };

        Some(Sample::new(id, provenance, pixels))
    }

    async fn materialize(&self, sample: Sample, ledger: &EvidenceLedger) -> MediaResult<Sample> {
        ledger.record_sample();
        if !self.config.materialize {
            return Ok(sample);
        }

        let path = ledger.allocate_file("jpg");
        let owned = sample.clone();
        let bytes = tokio::task::spawn_blocking(move || owned.encode_jpeg())
            .await
            .map_err(|e| MediaError::DecodeFailure {
                reason: e.to_string(),
            })??;
        tokio::fs::write(&path, bytes).await?;

        Ok(sample.with_path(path))
    }
}

async fn face_crop(
    locator: &dyn FaceLocator,
    frame: &DecodedFrame,
) -> Option<(image::RgbImage, super::types::BoundingBox)> {
    let boxes = match locator.locate(&frame.image).await {
        Ok(boxes) => boxes,
        Err(e) => {
            warn!(frame = frame.index, error = %e, "Face localization failed, dropping frame");
            return None;
        }
    };

    let Some(bbox) = largest_box(&boxes) else {
        debug!(frame = frame.index, "No face found, dropping frame");
        return None;
    };

    match crop_to_box(&frame.image, &bbox) {
        Some(crop) => Some((crop, bbox)),
        None => {
            debug!(frame = frame.index, ?bbox, "Degenerate face crop, dropping frame");
            None
        }
    }
}

/// Repeats the last sample until the set reaches `length`. Empty sets stay empty.
/// Repeats are marked so scoring can skip them.
fn pad_by_repeat(samples: &mut Vec<Sample>, length: usize) {
    let Some(last) = samples.last().cloned() else {
        return;
    };
    while samples.len() < length {
        let id = samples.len();
        samples.push(last.repeated(id));
    }
}
