use rand::Rng;

use crate::constants::FALLBACK_FPS;

/// How many frames uniform temporal sampling asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleCount {
    /// A fixed K.
    Fixed(usize),
    /// `ceil(total_frames * ratio)`, clamped to `[1, cap]`.
    Ratio { ratio: f64, cap: usize },
}

impl SampleCount {
    /// Resolves K for a video with `total_frames` frames.
    pub fn resolve(&self, total_frames: u64) -> usize {
        match *self {
            SampleCount::Fixed(count) => count,
            SampleCount::Ratio { ratio, cap } => {
                let wanted = (total_frames as f64 * ratio).ceil();
                let wanted = if wanted.is_finite() && wanted > 0.0 {
                    wanted as usize
                } else {
                    1
                };
                wanted.clamp(1, cap.max(1))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniformPolicy {
    #[default]
    /// Evenly spaced, deterministic indices.
    Even,
    /// K distinct indices drawn without replacement.
    Random,
}

/// Frame selection strategy for video artifacts. Still images ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SamplingStrategy {
    /// Count-bounded temporal sampling.
    Uniform {
        count: SampleCount,
        policy: UniformPolicy,
    },
    #[default]
    /// One frame per elapsed second at the native frame rate; variable length.
    PerSecond,
}

impl SamplingStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            SamplingStrategy::Uniform {
                policy: UniformPolicy::Even,
                ..
            } => "uniform",
            SamplingStrategy::Uniform {
                policy: UniformPolicy::Random,
                ..
            } => "random",
            SamplingStrategy::PerSecond => "per-second",
        }
    }
}

/// Evenly spaced indices over `[0, total_frames - 1]`.
///
/// `indices[i] = round(i * (total_frames - 1) / (k - 1))` for `k > 1`; a single
/// request yields the middle frame. `k` is clamped to `total_frames`, which keeps
/// the indices distinct.
pub fn even_indices(total_frames: u64, k: usize) -> Vec<u64> {
    if total_frames == 0 || k == 0 {
        return Vec::new();
    }

    let k = (k as u64).min(total_frames);
    if k == 1 {
        return vec![(total_frames - 1) / 2];
    }

    let last = (total_frames - 1) as f64;
    let steps = (k - 1) as f64;
    (0..k)
        .map(|i| ((i as f64) * last / steps).round() as u64)
        .collect()
}

/// `k` distinct indices from `[0, total_frames - 1]`, returned in ascending order.
pub fn random_indices<R: Rng + ?Sized>(total_frames: u64, k: usize, rng: &mut R) -> Vec<u64> {
    if total_frames == 0 || k == 0 {
        return Vec::new();
    }

    let total = usize::try_from(total_frames).unwrap_or(usize::MAX);
    let k = k.min(total);
    let mut indices: Vec<u64> = rand::seq::index::sample(rng, total, k)
        .into_iter()
        .map(|i| i as u64)
        .collect();
    indices.sort_unstable();
    indices
}

/// Frame stride for per-second extraction: `round(fps)`, with a 24 fps fallback
/// when the container reports no usable rate.
pub fn per_second_step(fps: f64) -> u64 {
    let fps = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FPS
    };
    (fps.round() as u64).max(1)
}
