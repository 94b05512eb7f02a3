use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};

use crate::constants::{IMAGE_EXTENSIONS, SAMPLE_JPEG_QUALITY, VIDEO_EXTENSIONS};

use super::error::{MediaError, MediaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a filename by extension (case-insensitive).
    pub fn from_filename(name: &str) -> MediaResult<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(MediaKind::Video)
        } else {
            Err(MediaError::UnsupportedFormat { extension })
        }
    }
}

/// An immutable reference to the uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    filename: String,
    kind: MediaKind,
    byte_len: u64,
}

impl Artifact {
    /// Opens `path`, classifying it by the declared `filename`.
    pub async fn open(path: impl Into<PathBuf>, filename: impl Into<String>) -> MediaResult<Self> {
        let path = path.into();
        let filename = filename.into();
        let kind = MediaKind::from_filename(&filename)?;
        let byte_len = tokio::fs::metadata(&path).await?.len();

        Ok(Self {
            path,
            filename,
            kind,
            byte_len,
        })
    }

    pub fn new(path: PathBuf, filename: String, kind: MediaKind, byte_len: u64) -> Self {
        Self {
            path,
            filename,
            kind,
            byte_len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }
}

/// Axis-aligned face box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Where a sample came from in the source media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Provenance {
    /// Source frame index (0 for still images).
    pub frame_index: u64,
    /// Seconds from the start of the video, when the frame rate is known.
    pub timestamp_secs: Option<f64>,
    /// Face crop, when face-localized.
    pub bbox: Option<BoundingBox>,
}

impl Provenance {
    pub fn frame(frame_index: u64) -> Self {
        Self {
            frame_index,
            timestamp_secs: None,
            bbox: None,
        }
    }
}

/// One extracted visual unit. Pixel data is shared and never mutated after creation.
#[derive(Clone)]
pub struct Sample {
    id: usize,
    provenance: Provenance,
    pixels: Arc<RgbImage>,
    path: Option<PathBuf>,
    repeat_of: Option<usize>,
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("id", &self.id)
            .field("provenance", &self.provenance)
            .field("dimensions", &self.pixels.dimensions())
            .field("path", &self.path)
            .field("repeat_of", &self.repeat_of)
            .finish()
    }
}

impl Sample {
    pub fn new(id: usize, provenance: Provenance, pixels: RgbImage) -> Self {
        Self {
            id,
            provenance,
            pixels: Arc::new(pixels),
            path: None,
            repeat_of: None,
        }
    }

    /// Position of the sample in the set it was extracted into.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Materialized copy on disk, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// A copy under a new id that shares this sample's pixels and file.
    pub(crate) fn repeated(&self, id: usize) -> Self {
        Self {
            id,
            provenance: self.provenance,
            pixels: Arc::clone(&self.pixels),
            path: self.path.clone(),
            repeat_of: Some(self.repeat_of.unwrap_or(self.id)),
        }
    }

    /// Id of the sample this one pads out, when it is a repetition.
    pub fn repeat_of(&self) -> Option<usize> {
        self.repeat_of
    }

    pub fn is_repeat(&self) -> bool {
        self.repeat_of.is_some()
    }

    /// Encodes the pixels as JPEG, the format scorer backends accept.
    pub fn encode_jpeg(&self) -> MediaResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buf, SAMPLE_JPEG_QUALITY);
        self.pixels.write_with_encoder(encoder)?;
        Ok(buf.into_inner())
    }
}

/// Ordered, finite samples for one artifact.
///
/// Extraction produces temporal order and budgeting keeps it. In face mode the set is
/// the padded sequence; [`SampleSet::distinct`] drops the repetitions.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
    candidates: usize,
}

impl SampleSet {
    pub fn new(samples: Vec<Sample>) -> Self {
        let candidates = samples.len();
        Self {
            samples,
            candidates,
        }
    }

    /// Records how many frames the sampling strategy selected before budgeting and
    /// face filtering.
    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    /// Every sample that is not a padding repetition, in order.
    pub fn distinct(&self) -> SampleSet {
        let samples = self
            .samples
            .iter()
            .filter(|s| !s.is_repeat())
            .cloned()
            .collect();
        SampleSet {
            samples,
            candidates: self.candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn into_vec(self) -> Vec<Sample> {
        self.samples
    }

    pub fn ids(&self) -> Vec<usize> {
        self.samples.iter().map(Sample::id).collect()
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
