use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use tracing::{debug, info};

use crate::media::Sample;

use super::device::{DevicePreference, select_device};
use super::error::ScoringError;
use super::scorer::Scorer;
use super::types::RawScore;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A two-class image classifier: `[N, 3, S, S]` in, `[N, 2]` logits `(real, fake)` out.
pub trait InferenceModel: Send + Sync {
    /// Edge length `S` of the square input.
    fn input_size(&self) -> usize;

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor>;
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifierConfig {
    input_size: usize,
    hidden_size: usize,
}

/// Classifier head over flattened normalized pixels, loaded from
/// `config.json` + `model.safetensors` (`fc1`, `fc2`).
pub struct ImageClassifier {
    fc1: Linear,
    fc2: Linear,
    input_size: usize,
}

impl ImageClassifier {
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> candle_core::Result<Self> {
        let model_dir = model_dir.as_ref();
        let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: ClassifierConfig = serde_json::from_str(&config_content)
            .map_err(|e| candle_core::Error::Msg(format!("Failed to parse config: {e}")))?;

        let weights_path = model_dir.join("model.safetensors");
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };

        Self::from_var_builder(vb, config.input_size, config.hidden_size)
    }

    pub fn from_var_builder(
        vb: VarBuilder,
        input_size: usize,
        hidden_size: usize,
    ) -> candle_core::Result<Self> {
        let features = 3 * input_size * input_size;
        let fc1 = candle_nn::linear(features, hidden_size, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(hidden_size, 2, vb.pp("fc2"))?;
        Ok(Self {
            fc1,
            fc2,
            input_size,
        })
    }
}

impl InferenceModel for ImageClassifier {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let x = input.flatten_from(1)?;
        let x = self.fc1.forward(&x)?.relu()?;
        self.fc2.forward(&x)
    }
}

/// Resizes to `size`x`size` and lays out ImageNet-normalized CHW floats as `[1, 3, S, S]`.
pub fn preprocess(pixels: &RgbImage, size: usize, device: &Device) -> candle_core::Result<Tensor> {
    let edge = size as u32;
    let resized = imageops::resize(pixels, edge, edge, FilterType::Triangle);
    let plane = size * size;

    let mut data = vec![0f32; 3 * plane];
    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            let v = f32::from(pixel.0[c]) / 255.0;
            data[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Tensor::from_vec(data, (1, 3, size, size), device)
}

/// Scores samples with an in-process model. Returns logits for fusion to calibrate.
pub struct LocalModelScorer {
    model: Arc<dyn InferenceModel>,
    device: Device,
}

impl std::fmt::Debug for LocalModelScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalModelScorer")
            .field("device", &format!("{:?}", self.device))
            .field("input_size", &self.model.input_size())
            .finish()
    }
}

impl LocalModelScorer {
    pub fn new(model: Arc<dyn InferenceModel>, device: Device) -> Self {
        Self { model, device }
    }

    /// Loads an [`ImageClassifier`] from `model_dir` on the preferred device.
    pub fn load(model_dir: &Path, device: DevicePreference) -> Result<Self, ScoringError> {
        for required in ["config.json", "model.safetensors"] {
            if !model_dir.join(required).exists() {
                return Err(ScoringError::ModelLoadFailed {
                    reason: format!("Missing {required} in {}", model_dir.display()),
                });
            }
        }

        let device = select_device(device)?;
        info!(model_path = %model_dir.display(), ?device, "Loading local scoring model");

        let model = ImageClassifier::load(model_dir, &device).map_err(|e| {
            ScoringError::ModelLoadFailed {
                reason: e.to_string(),
            }
        })?;

        Ok(Self::new(Arc::new(model), device))
    }
}

#[async_trait]
impl Scorer for LocalModelScorer {
    fn name(&self) -> &str {
        "local"
    }

    async fn score(&self, sample: &Sample) -> Result<RawScore, ScoringError> {
        let model = Arc::clone(&self.model);
        let device = self.device.clone();
        let sample = sample.clone();

        let logits = tokio::task::spawn_blocking(move || -> Result<Vec<f32>, ScoringError> {
            let input = preprocess(sample.pixels(), model.input_size(), &device)?;
            let output = model.forward(&input)?;
            Ok(output.flatten_all()?.to_vec1::<f32>()?)
        })
        .await
        .map_err(|e| ScoringError::rejected(format!("inference task failed: {e}")))??;

        match logits.as_slice() {
            [real, fake] if real.is_finite() && fake.is_finite() => {
                debug!(real = real, fake = fake, "Local model logits");
                Ok(RawScore::logits(f64::from(*real), f64::from(*fake)))
            }
            other => Err(ScoringError::rejected(format!(
                "expected two finite logits, got {other:?}"
            ))),
        }
    }
}
