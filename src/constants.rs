//! Cross-cutting, shared constants.
//!
//! Defaults here are configuration starting points, not protocol. Every value that
//! affects a verdict can be overridden through [`crate::config::Config`].

/// File extensions treated as still images (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "tiff"];

/// File extensions treated as video containers (lowercase, without the dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "flv"];

/// Frame rate assumed when the container reports zero.
pub const FALLBACK_FPS: f64 = 24.0;

/// Default number of samples forwarded to scoring per invocation.
pub const DEFAULT_MAX_SAMPLES: usize = 10;

/// Default fixed K for uniform/random temporal sampling.
pub const DEFAULT_SAMPLE_COUNT: usize = 8;

/// Default upper bound for ratio-derived sample counts.
pub const DEFAULT_SAMPLE_CAP: usize = 32;

/// Default sequence length that face-localized sampling pads up to.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 7;

/// Default longest wait for the next decoded video frame.
pub const DEFAULT_DECODE_STALL_SECS: u64 = 60;

/// Default per-call scoring timeout.
pub const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrent scoring calls within one invocation.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Read size for the chain-of-custody digest.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// JPEG quality used when samples are encoded for scorers or written to scratch.
pub const SAMPLE_JPEG_QUALITY: u8 = 90;

/// Threshold (exclusive, in percent) on the average above which media is called fake.
pub const FAKE_AVG_PERCENT: f64 = 50.0;

/// Threshold (exclusive, in percent) on the peak sample that flags tampering.
pub const SUSPICIOUS_MAX_PERCENT: f64 = 80.0;

/// Threshold (exclusive, in percent) on the peak sample that makes a result uncertain.
pub const UNCERTAIN_MAX_PERCENT: f64 = 50.0;

/// Threshold (exclusive) for the binary FAKE/REAL output mode.
pub const BINARY_FAKE_THRESHOLD: f64 = 0.5;

/// Rounds a probability in `[0, 1]` to a percentage with two decimals.
///
/// Presentation only; classification compares unrounded values.
pub fn to_display_percent(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}
