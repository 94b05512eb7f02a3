use std::cmp::Ordering;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, imageops};
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::constants::SAMPLE_JPEG_QUALITY;

use super::error::{MediaError, MediaResult};
use super::types::BoundingBox;

const LOCATOR_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
/// Face localization collaborator. Boxes come back in no particular order.
pub trait FaceLocator: Send + Sync {
    async fn locate(&self, frame: &RgbImage) -> MediaResult<Vec<BoundingBox>>;
}

/// Posts JPEG frames to an HTTP detector that answers `{"boxes": [[x1,y1,x2,y2], ...]}`.
pub struct HttpFaceLocator {
    url: String,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct LocatorResponse {
    #[serde(default)]
    boxes: Vec<[f32; 4]>,
}

impl HttpFaceLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: HttpClient::builder()
                .timeout(LOCATOR_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
        }
    }
}

#[async_trait]
impl FaceLocator for HttpFaceLocator {
    async fn locate(&self, frame: &RgbImage) -> MediaResult<Vec<BoundingBox>> {
        let mut buf = Cursor::new(Vec::new());
        frame.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, SAMPLE_JPEG_QUALITY))?;

        let resp = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(buf.into_inner())
            .send()
            .await
            .map_err(|e| MediaError::FaceLocatorUnavailable {
                reason: format!("request failed: {e}"),
            })?;

        if !resp.status().is_success() {
            return Err(MediaError::FaceLocatorUnavailable {
                reason: format!("locator returned {}", resp.status()),
            });
        }

        let body: LocatorResponse =
            resp.json()
                .await
                .map_err(|e| MediaError::FaceLocatorUnavailable {
                    reason: format!("unreadable locator response: {e}"),
                })?;

        Ok(body.boxes.into_iter().map(BoundingBox::from).collect())
    }
}

/// The box with the largest `(x2-x1)*(y2-y1)`.
pub fn largest_box(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    boxes
        .iter()
        .copied()
        .max_by(|a, b| a.area().partial_cmp(&b.area()).unwrap_or(Ordering::Equal))
}

/// Crops `frame` to `bbox`, clamped to the frame. `None` when the crop has no area.
pub fn crop_to_box(frame: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (width, height) = frame.dimensions();
    let clamp = |v: f32, max: u32| -> u32 {
        if v.is_finite() && v > 0.0 {
            (v as u32).min(max)
        } else {
            0
        }
    };

    let x1 = clamp(bbox.x1, width);
    let y1 = clamp(bbox.y1, height);
    let x2 = clamp(bbox.x2, width);
    let y2 = clamp(bbox.y2, height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image())
}
