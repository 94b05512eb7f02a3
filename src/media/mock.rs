use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::decoder::{
    DecodedFrame, FrameLabels, FrameSelection, FrameStream, VideoDecoder, VideoInfo,
};
use super::error::{MediaError, MediaResult};
use super::face::FaceLocator;
use super::types::BoundingBox;

/// In-memory decoder producing solid frames whose red channel encodes the index.
pub struct MockVideoDecoder {
    info: VideoInfo,
    /// Frames the codec can actually reach; below `info.total_frames` when the
    /// container overstates its length.
    decodable: u64,
    unreadable: bool,
    decoded: Mutex<Vec<u64>>,
}

impl MockVideoDecoder {
    pub fn new(total_frames: u64, fps: f64) -> Self {
        Self {
            info: VideoInfo {
                total_frames,
                fps,
                width: 32,
                height: 24,
            },
            decodable: total_frames,
            unreadable: false,
            decoded: Mutex::new(Vec::new()),
        }
    }

    /// A decoder that cannot open anything.
    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::new(0, 0.0)
        }
    }

    /// Reports `total_frames` but stops producing frames `missing` short of it.
    pub fn overcounted(total_frames: u64, fps: f64, missing: u64) -> Self {
        Self {
            decodable: total_frames.saturating_sub(missing),
            ..Self::new(total_frames, fps)
        }
    }

    /// Every frame index handed out so far.
    pub fn decoded_indices(&self) -> Vec<u64> {
        self.decoded.lock().clone()
    }

    fn image(&self, index: u64) -> RgbImage {
        let shade = (index % 256) as u8;
        RgbImage::from_pixel(self.info.width, self.info.height, Rgb([shade, 64, 128]))
    }

    fn check_readable(&self) -> MediaResult<()> {
        if self.unreadable {
            return Err(MediaError::DecodeFailure {
                reason: "mock decoder cannot open the stream".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VideoDecoder for MockVideoDecoder {
    async fn probe(&self, _path: &Path) -> MediaResult<VideoInfo> {
        self.check_readable()?;
        Ok(self.info)
    }

    async fn stream_frames(
        &self,
        _path: &Path,
        _info: &VideoInfo,
        selection: FrameSelection,
    ) -> MediaResult<FrameStream> {
        self.check_readable()?;
        let selection = selection.normalized();
        let emitted: Vec<u64> = match &selection {
            FrameSelection::Indices(indices) => indices
                .iter()
                .copied()
                .filter(|i| *i < self.decodable)
                .collect(),
            FrameSelection::Stride(step) => (0..self.decodable).step_by(*step as usize).collect(),
        };

        // Labels are assigned by emission order, as with a real decoder.
        let mut labels = FrameLabels::new(&selection);
        let mut items = Vec::with_capacity(emitted.len() + 1);
        for source in emitted {
            let Some(index) = labels.next_label() else {
                break;
            };
            self.decoded.lock().push(source);
            items.push(Ok(DecodedFrame {
                index,
                image: self.image(source),
            }));
        }
        if let Err(e) = labels.finish() {
            items.push(Err(e));
        }

        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            let _ = tx.try_send(item);
        }
        Ok(rx)
    }
}

/// Scripted face locator: pops one response per call, then repeats the fallback.
pub struct MockFaceLocator {
    script: Mutex<VecDeque<Vec<BoundingBox>>>,
    fallback: Vec<BoundingBox>,
    calls: Mutex<usize>,
}

impl MockFaceLocator {
    /// Returns the same boxes for every frame.
    pub fn always(boxes: Vec<BoundingBox>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: boxes,
            calls: Mutex::new(0),
        }
    }

    /// Never finds a face.
    pub fn none() -> Self {
        Self::always(Vec::new())
    }

    /// Returns `script[i]` for the i-th call, then no faces.
    pub fn scripted(script: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Vec::new(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl FaceLocator for MockFaceLocator {
    async fn locate(&self, _frame: &RgbImage) -> MediaResult<Vec<BoundingBox>> {
        *self.calls.lock() += 1;
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
