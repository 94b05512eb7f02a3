//! Video decoding collaborator.
//!
//! `FfmpegDecoder` shells out to `ffprobe`/`ffmpeg` and reads `rgb24` raw frames from
//! stdout one at a time. Frames are selected inside ffmpeg with a `select` filter so
//! only the requested frames cross the pipe, and each one is handed over a bounded
//! channel as soon as it is complete. At most a couple of frames are in memory per
//! decode, whatever the length of the video.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::DEFAULT_DECODE_STALL_SECS;

use super::error::{MediaError, MediaResult};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const FRAME_CHANNEL_CAPACITY: usize = 2;

/// Stream properties reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub total_frames: u64,
    /// Native frame rate; `0.0` when the container does not report one.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub index: u64,
    pub image: RgbImage,
}

/// Which frames a decode should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Exactly these frame numbers. Every one of them must be delivered.
    Indices(Vec<u64>),
    /// Every frame whose number is a multiple of the step.
    Stride(u64),
}

impl FrameSelection {
    /// Sorted, deduplicated indices and a step of at least 1.
    pub fn normalized(self) -> Self {
        match self {
            FrameSelection::Indices(mut indices) => {
                indices.sort_unstable();
                indices.dedup();
                FrameSelection::Indices(indices)
            }
            FrameSelection::Stride(step) => FrameSelection::Stride(step.max(1)),
        }
    }

    fn select_expr(&self) -> String {
        match self {
            FrameSelection::Indices(indices) => indices
                .iter()
                .map(|i| format!("eq(n,{i})"))
                .collect::<Vec<_>>()
                .join("+"),
            FrameSelection::Stride(step) => format!("not(mod(n,{step}))"),
        }
    }
}

/// Receiving end of a decode. Frames arrive in ascending order; an `Err` item ends
/// the stream. Dropping the receiver stops the decode.
pub type FrameStream = mpsc::Receiver<MediaResult<DecodedFrame>>;

/// Decodes frames from a video artifact.
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// Reads stream properties without decoding frames.
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo>;

    /// Starts decoding the selected frames and returns the stream they arrive on.
    async fn stream_frames(
        &self,
        path: &Path,
        info: &VideoInfo,
        selection: FrameSelection,
    ) -> MediaResult<FrameStream>;
}

/// Assigns source frame numbers to frames in the order the decoder emits them.
///
/// An `Indices` decode that ends before every listed frame arrived is a failure:
/// the frames that did arrive cannot be matched to their numbers any more.
#[derive(Debug)]
pub(crate) struct FrameLabels {
    kind: LabelKind,
    delivered: usize,
}

#[derive(Debug)]
enum LabelKind {
    Listed { indices: Vec<u64> },
    Stride { step: u64 },
}

impl FrameLabels {
    pub(crate) fn new(selection: &FrameSelection) -> Self {
        let kind = match selection {
            FrameSelection::Indices(indices) => LabelKind::Listed {
                indices: indices.clone(),
            },
            FrameSelection::Stride(step) => LabelKind::Stride { step: (*step).max(1) },
        };
        Self { kind, delivered: 0 }
    }

    /// Label for the next emitted frame, or `None` once every listed frame is out.
    pub(crate) fn next_label(&mut self) -> Option<u64> {
        let label = match &self.kind {
            LabelKind::Listed { indices } => indices.get(self.delivered).copied(),
            LabelKind::Stride { step } => Some(self.delivered as u64 * step),
        }?;
        self.delivered += 1;
        Some(label)
    }

    /// Fails when a listed selection was cut short.
    pub(crate) fn finish(&self) -> MediaResult<()> {
        match &self.kind {
            LabelKind::Listed { indices } if self.delivered < indices.len() => {
                Err(MediaError::DecodeFailure {
                    reason: format!(
                        "ffmpeg returned {} of {} requested frames",
                        self.delivered,
                        indices.len()
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Fills `buf` with exactly one frame.
///
/// Returns `Ok(false)` on a clean end of stream before the first byte. A stream that
/// ends inside a frame is a decode failure.
pub(crate) async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8],
) -> MediaResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(MediaError::DecodeFailure {
                reason: format!("truncated frame: {filled} of {} bytes", buf.len()),
            });
        }
        filled += n;
    }
    Ok(true)
}

/// `ffprobe`/`ffmpeg` implementation of [`VideoDecoder`].
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    stall_timeout: Duration,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            stall_timeout: Duration::from_secs(DEFAULT_DECODE_STALL_SECS),
        }
    }

    /// Longest wait for the next frame before the decode is abandoned. There is no
    /// bound on total decode time, so long videos decode as long as ffmpeg keeps
    /// producing frames.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    async fn run_probe(&self, args: Vec<String>) -> MediaResult<Vec<u8>> {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(&args)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| MediaError::DecodeFailure {
            reason: format!("failed to spawn ffprobe: {e}"),
        })?;

        let output = match tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output()).await {
            Ok(res) => res.map_err(|e| MediaError::DecodeFailure {
                reason: format!("failed waiting for ffprobe: {e}"),
            })?,
            Err(_) => {
                return Err(MediaError::DecodeFailure {
                    reason: format!("ffprobe timed out after {:?}", PROBE_TIMEOUT),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MediaError::DecodeFailure {
                reason: format!("ffprobe failed: {stderr}"),
            });
        }

        Ok(output.stdout)
    }

    fn decode_args(path: &Path, selection: &FrameSelection) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            path.to_string_lossy().to_string(),
            "-an".to_string(),
            "-sn".to_string(),
            "-vf".to_string(),
            format!("select='{}'", selection.select_expr()),
            "-vsync".to_string(),
            "0".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-count_packets".to_string(),
            "-show_entries".to_string(),
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,nb_read_packets"
                .to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.to_string_lossy().to_string(),
        ];

        let stdout = self.run_probe(args).await?;
        let info = parse_probe_output(&stdout)?;

        debug!(
            total_frames = info.total_frames,
            fps = info.fps,
            width = info.width,
            height = info.height,
            "Probed video stream"
        );
        Ok(info)
    }

    async fn stream_frames(
        &self,
        path: &Path,
        info: &VideoInfo,
        selection: FrameSelection,
    ) -> MediaResult<FrameStream> {
        let selection = selection.normalized();
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        if matches!(&selection, FrameSelection::Indices(indices) if indices.is_empty()) {
            return Ok(rx);
        }

        let frame_len = info.width as usize * info.height as usize * 3;
        if frame_len == 0 {
            return Err(MediaError::DecodeFailure {
                reason: "zero-sized frame".to_string(),
            });
        }

        let mut child = Command::new(&self.ffmpeg_path)
            .args(Self::decode_args(path, &selection))
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::DecodeFailure {
                reason: format!("failed to spawn ffmpeg: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| MediaError::DecodeFailure {
            reason: "ffmpeg stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).trim().to_string()
            })
        });

        let pump = FramePump {
            child,
            stdout,
            stderr,
            labels: FrameLabels::new(&selection),
            width: info.width,
            height: info.height,
            frame_len,
            stall_timeout: self.stall_timeout,
        };
        tokio::spawn(pump.run(tx));
        Ok(rx)
    }
}

/// Owns one ffmpeg child and forwards its frames. The child is killed when the pump
/// is dropped, which happens as soon as the receiver goes away.
struct FramePump {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    labels: FrameLabels,
    width: u32,
    height: u32,
    frame_len: usize,
    stall_timeout: Duration,
}

impl FramePump {
    async fn run(mut self, tx: mpsc::Sender<MediaResult<DecodedFrame>>) {
        if let Err(e) = self.forward(&tx).await {
            warn!(error = %e, "Video decode failed");
            let _ = tx.send(Err(e)).await;
        }
    }

    async fn forward(&mut self, tx: &mpsc::Sender<MediaResult<DecodedFrame>>) -> MediaResult<()> {
        loop {
            let mut buf = vec![0u8; self.frame_len];
            let complete =
                match tokio::time::timeout(self.stall_timeout, read_frame(&mut self.stdout, &mut buf))
                    .await
                {
                    Ok(res) => res?,
                    Err(_) => {
                        return Err(MediaError::DecodeFailure {
                            reason: format!(
                                "ffmpeg produced no frame for {:?}",
                                self.stall_timeout
                            ),
                        });
                    }
                };
            if !complete {
                break;
            }

            let Some(index) = self.labels.next_label() else {
                debug!("ffmpeg emitted frames past the requested set, stopping decode");
                let _ = self.child.start_kill();
                return Ok(());
            };
            let image = RgbImage::from_raw(self.width, self.height, buf).ok_or_else(|| {
                MediaError::DecodeFailure {
                    reason: "raw frame buffer size mismatch".to_string(),
                }
            })?;
            if tx.send(Ok(DecodedFrame { index, image })).await.is_err() {
                debug!("Frame receiver dropped, stopping decode");
                return Ok(());
            }
        }

        let status = match tokio::time::timeout(self.stall_timeout, self.child.wait()).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(MediaError::DecodeFailure {
                    reason: "ffmpeg did not exit after closing its output".to_string(),
                });
            }
        };
        if !status.success() {
            let stderr = match self.stderr.take() {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };
            return Err(MediaError::DecodeFailure {
                reason: format!("ffmpeg failed: {stderr}"),
            });
        }

        self.labels.finish()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

pub(crate) fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| MediaError::DecodeFailure {
            reason: format!("unreadable ffprobe output: {e}"),
        })?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::DecodeFailure {
            reason: "no video stream found".to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaError::DecodeFailure {
                reason: "video stream has no dimensions".to_string(),
            });
        }
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .filter(|fps| *fps > 0.0)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .unwrap_or(0.0);

    let total_frames = stream
        .nb_read_packets
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .or_else(|| stream.nb_frames.as_deref().and_then(|s| s.parse().ok()))
        .unwrap_or(0);

    Ok(VideoInfo {
        total_frames,
        fps,
        width,
        height,
    })
}

fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 { Some(0.0) } else { Some(num / den) }
        }
        None => value.trim().parse().ok(),
    }
}
