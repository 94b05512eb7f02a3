//! Media-to-samples extraction.
//!
//! [`MediaSampler`] turns an [`Artifact`] into an ordered [`SampleSet`]:
//! - still images yield exactly one sample
//! - videos are sampled by a [`SamplingStrategy`] (uniform / random / per-second)
//! - when a [`FaceLocator`] is attached, each frame is cropped to its largest face,
//!   frames without a face are dropped, and the set is padded by repetition
//!
//! Codec work is delegated to a [`VideoDecoder`]; the production decoder shells out
//! to `ffprobe`/`ffmpeg` and streams frames back one at a time. Without face mode the
//! sample budget is applied to frame indices before anything is decoded.

pub mod decoder;
pub mod error;
pub mod face;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod sampler;
pub mod strategy;
pub mod types;


pub use decoder::{DecodedFrame, FfmpegDecoder, FrameSelection, FrameStream, VideoDecoder, VideoInfo};
pub use error::{MediaError, MediaResult};
pub use face::{FaceLocator, HttpFaceLocator, crop_to_box, largest_box};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockFaceLocator, MockVideoDecoder};
pub use sampler::{MediaSampler, SamplerConfig};
pub use strategy::{SampleCount, SamplingStrategy, UniformPolicy, even_indices, per_second_step, random_indices};
pub use types::{Artifact, BoundingBox, MediaKind, Provenance, Sample, SampleSet};
