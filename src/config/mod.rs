//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `LUCID_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cleanup::CleanupPolicy;
use crate::constants::{
    DEFAULT_DECODE_STALL_SECS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_SAMPLES, DEFAULT_SAMPLE_CAP,
    DEFAULT_SAMPLE_COUNT, DEFAULT_SCORER_TIMEOUT_SECS, DEFAULT_SEQUENCE_LENGTH,
};
use crate::evidence::DigestAlgorithm;
use crate::fusion::FusionPolicy;
use crate::media::{SampleCount, SamplerConfig, SamplingStrategy, UniformPolicy};
use crate::pipeline::PipelineConfig;
use crate::scoring::{DEFAULT_SIGHTENGINE_URL, DevicePreference};

/// Default upload limit: 256 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Probability the `mock` branch reports. The mock is never a default branch.
pub const DEFAULT_MOCK_SCORE: f64 = 0.1;

/// Frame selection mode, as named in `LUCID_SAMPLING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    #[default]
    PerSecond,
    Uniform,
    Random,
}

impl FromStr for SamplingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-second" | "per_second" => Ok(SamplingMode::PerSecond),
            "uniform" => Ok(SamplingMode::Uniform),
            "random" => Ok(SamplingMode::Random),
            other => Err(format!("expected per-second, uniform or random, got '{other}'")),
        }
    }
}

/// A scoring backend selectable in `LUCID_SCORERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScorerKind {
    Sightengine,
    Local,
    Mock,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Sightengine => "sightengine",
            ScorerKind::Local => "local",
            ScorerKind::Mock => "mock",
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScorerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sightengine" | "remote" => Ok(ScorerKind::Sightengine),
            "local" => Ok(ScorerKind::Local),
            "mock" => Ok(ScorerKind::Mock),
            other => Err(format!("unknown scorer '{other}'")),
        }
    }
}

/// Service configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `LUCID_*` overrides on top of defaults, then
/// [`Config::validate`] before building anything from it.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Scratch root; each invocation works in `<scratch_dir>/<uuid>`.
    pub scratch_dir: PathBuf,

    pub max_upload_bytes: usize,

    pub sampling: SamplingMode,

    /// Fixed K for uniform/random sampling.
    pub sample_count: usize,

    /// When set, K = ceil(total_frames * ratio) clamped to `[1, sample_cap]`.
    pub sample_ratio: Option<f64>,

    pub sample_cap: usize,

    /// Crop frames to their largest face; requires `face_locator_url`.
    pub face_mode: bool,

    pub face_locator_url: Option<String>,

    /// Face-mode sequences are padded up to this length.
    pub sequence_length: usize,

    pub materialize_samples: bool,

    /// Budget of samples forwarded to scoring. Default: `10`.
    pub max_samples: usize,

    /// Scoring branches, in order. Default: `sightengine`, which needs credentials.
    pub scorers: Vec<ScorerKind>,

    pub sightengine_url: String,
    pub sightengine_user: Option<String>,
    pub sightengine_secret: Option<String>,

    pub scorer_timeout_secs: u64,

    pub max_in_flight: usize,

    /// Local model directory (`config.json` + `model.safetensors`).
    pub model_path: Option<PathBuf>,

    /// Calibration temperature for the local branch.
    pub model_temperature: Option<f64>,

    /// Device for the local branch. Default: `auto`.
    pub device: DevicePreference,

    pub mock_score: f64,

    /// Explicit fusion policy; derived from the branch count when unset.
    pub fusion: Option<FusionPolicy>,

    pub cleanup: CleanupPolicy,

    pub digest: DigestAlgorithm,

    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    /// Longest wait for the next decoded frame. Default: `60`.
    pub decode_stall_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("scratch_dir", &self.scratch_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("sampling", &self.sampling)
            .field("sample_count", &self.sample_count)
            .field("sample_ratio", &self.sample_ratio)
            .field("sample_cap", &self.sample_cap)
            .field("face_mode", &self.face_mode)
            .field("face_locator_url", &self.face_locator_url)
            .field("sequence_length", &self.sequence_length)
            .field("materialize_samples", &self.materialize_samples)
            .field("max_samples", &self.max_samples)
            .field("scorers", &self.scorers)
            .field("sightengine_url", &self.sightengine_url)
            .field("sightengine_user", &self.sightengine_user)
            .field(
                "sightengine_secret",
                &self.sightengine_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("scorer_timeout_secs", &self.scorer_timeout_secs)
            .field("max_in_flight", &self.max_in_flight)
            .field("model_path", &self.model_path)
            .field("model_temperature", &self.model_temperature)
            .field("device", &self.device)
            .field("mock_score", &self.mock_score)
            .field("fusion", &self.fusion)
            .field("cleanup", &self.cleanup)
            .field("digest", &self.digest)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("decode_stall_secs", &self.decode_stall_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            scratch_dir: env::temp_dir().join("lucid_trace"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sampling: SamplingMode::default(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_ratio: None,
            sample_cap: DEFAULT_SAMPLE_CAP,
            face_mode: false,
            face_locator_url: None,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            materialize_samples: true,
            max_samples: DEFAULT_MAX_SAMPLES,
            scorers: vec![ScorerKind::Sightengine],
            sightengine_url: DEFAULT_SIGHTENGINE_URL.to_string(),
            sightengine_user: None,
            sightengine_secret: None,
            scorer_timeout_secs: DEFAULT_SCORER_TIMEOUT_SECS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            model_path: None,
            model_temperature: None,
            device: DevicePreference::default(),
            mock_score: DEFAULT_MOCK_SCORE,
            fusion: None,
            cleanup: CleanupPolicy::default(),
            digest: DigestAlgorithm::default(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            decode_stall_secs: DEFAULT_DECODE_STALL_SECS,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "LUCID_PORT";
    const ENV_BIND_ADDR: &'static str = "LUCID_BIND_ADDR";
    const ENV_SCRATCH_DIR: &'static str = "LUCID_SCRATCH_DIR";
    const ENV_MAX_UPLOAD_BYTES: &'static str = "LUCID_MAX_UPLOAD_BYTES";
    const ENV_SAMPLING: &'static str = "LUCID_SAMPLING";
    const ENV_SAMPLE_COUNT: &'static str = "LUCID_SAMPLE_COUNT";
    const ENV_SAMPLE_RATIO: &'static str = "LUCID_SAMPLE_RATIO";
    const ENV_SAMPLE_CAP: &'static str = "LUCID_SAMPLE_CAP";
    const ENV_FACE_MODE: &'static str = "LUCID_FACE_MODE";
    const ENV_FACE_LOCATOR_URL: &'static str = "LUCID_FACE_LOCATOR_URL";
    const ENV_SEQUENCE_LENGTH: &'static str = "LUCID_SEQUENCE_LENGTH";
    const ENV_MATERIALIZE_SAMPLES: &'static str = "LUCID_MATERIALIZE_SAMPLES";
    const ENV_MAX_SAMPLES: &'static str = "LUCID_MAX_SAMPLES";
    const ENV_SCORERS: &'static str = "LUCID_SCORERS";
    const ENV_SIGHTENGINE_URL: &'static str = "LUCID_SIGHTENGINE_URL";
    const ENV_SIGHTENGINE_USER: &'static str = "LUCID_SIGHTENGINE_USER";
    const ENV_SIGHTENGINE_SECRET: &'static str = "LUCID_SIGHTENGINE_SECRET";
    const ENV_SCORER_TIMEOUT_SECS: &'static str = "LUCID_SCORER_TIMEOUT_SECS";
    const ENV_MAX_IN_FLIGHT: &'static str = "LUCID_MAX_IN_FLIGHT";
    const ENV_MODEL_PATH: &'static str = "LUCID_MODEL_PATH";
    const ENV_MODEL_TEMPERATURE: &'static str = "LUCID_MODEL_TEMPERATURE";
    const ENV_DEVICE: &'static str = "LUCID_DEVICE";
    const ENV_MOCK_SCORE: &'static str = "LUCID_MOCK_SCORE";
    const ENV_FUSION: &'static str = "LUCID_FUSION";
    const ENV_CLEANUP: &'static str = "LUCID_CLEANUP";
    const ENV_DIGEST: &'static str = "LUCID_DIGEST";
    const ENV_FFMPEG_PATH: &'static str = "LUCID_FFMPEG_PATH";
    const ENV_FFPROBE_PATH: &'static str = "LUCID_FFPROBE_PATH";
    const ENV_DECODE_STALL_SECS: &'static str = "LUCID_DECODE_STALL_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Unparseable numbers fall back to their defaults; unknown names for enum-like
    /// settings are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();

        Ok(Self {
            port: Self::parse_port_from_env(d.port)?,
            bind_addr: Self::parse_bind_addr_from_env(d.bind_addr)?,
            scratch_dir: Self::parse_path_from_env(Self::ENV_SCRATCH_DIR, d.scratch_dir),
            max_upload_bytes: Self::parse_number_from_env(
                Self::ENV_MAX_UPLOAD_BYTES,
                d.max_upload_bytes,
            ),
            sampling: Self::parse_named_from_env(Self::ENV_SAMPLING, d.sampling)?,
            sample_count: Self::parse_number_from_env(Self::ENV_SAMPLE_COUNT, d.sample_count),
            sample_ratio: Self::parse_optional_number_from_env(Self::ENV_SAMPLE_RATIO),
            sample_cap: Self::parse_number_from_env(Self::ENV_SAMPLE_CAP, d.sample_cap),
            face_mode: Self::parse_bool_from_env(Self::ENV_FACE_MODE, d.face_mode),
            face_locator_url: Self::parse_optional_string_from_env(Self::ENV_FACE_LOCATOR_URL),
            sequence_length: Self::parse_number_from_env(
                Self::ENV_SEQUENCE_LENGTH,
                d.sequence_length,
            ),
            materialize_samples: Self::parse_bool_from_env(
                Self::ENV_MATERIALIZE_SAMPLES,
                d.materialize_samples,
            ),
            max_samples: Self::parse_number_from_env(Self::ENV_MAX_SAMPLES, d.max_samples),
            scorers: Self::parse_scorers_from_env(d.scorers)?,
            sightengine_url: Self::parse_string_from_env(
                Self::ENV_SIGHTENGINE_URL,
                d.sightengine_url,
            ),
            sightengine_user: Self::parse_optional_string_from_env(Self::ENV_SIGHTENGINE_USER),
            sightengine_secret: Self::parse_optional_string_from_env(
                Self::ENV_SIGHTENGINE_SECRET,
            ),
            scorer_timeout_secs: Self::parse_number_from_env(
                Self::ENV_SCORER_TIMEOUT_SECS,
                d.scorer_timeout_secs,
            ),
            max_in_flight: Self::parse_number_from_env(Self::ENV_MAX_IN_FLIGHT, d.max_in_flight),
            model_path: Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH),
            model_temperature: Self::parse_optional_number_from_env(Self::ENV_MODEL_TEMPERATURE),
            device: Self::parse_named_from_env(Self::ENV_DEVICE, d.device)?,
            mock_score: Self::parse_number_from_env(Self::ENV_MOCK_SCORE, d.mock_score),
            fusion: Self::parse_optional_named_from_env(Self::ENV_FUSION)?,
            cleanup: Self::parse_named_from_env(Self::ENV_CLEANUP, d.cleanup)?,
            digest: Self::parse_named_from_env(Self::ENV_DIGEST, d.digest)?,
            ffmpeg_path: Self::parse_string_from_env(Self::ENV_FFMPEG_PATH, d.ffmpeg_path),
            ffprobe_path: Self::parse_string_from_env(Self::ENV_FFPROBE_PATH, d.ffprobe_path),
            decode_stall_secs: Self::parse_number_from_env(
                Self::ENV_DECODE_STALL_SECS,
                d.decode_stall_secs,
            ),
        })
    }

    /// Checks invariants and cross-field requirements (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scratch_dir.exists() && !self.scratch_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.scratch_dir.clone(),
            });
        }

        for (name, value) in [
            (Self::ENV_MAX_SAMPLES, self.max_samples),
            (Self::ENV_SAMPLE_COUNT, self.sample_count),
            (Self::ENV_SAMPLE_CAP, self.sample_cap),
            (Self::ENV_SEQUENCE_LENGTH, self.sequence_length),
            (Self::ENV_MAX_IN_FLIGHT, self.max_in_flight),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(name, value, "must be at least 1"));
            }
        }

        for (name, value) in [
            (Self::ENV_SCORER_TIMEOUT_SECS, self.scorer_timeout_secs),
            (Self::ENV_DECODE_STALL_SECS, self.decode_stall_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(name, value, "must be at least 1"));
            }
        }

        if let Some(ratio) = self.sample_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::invalid(
                    Self::ENV_SAMPLE_RATIO,
                    ratio,
                    "must be in (0, 1]",
                ));
            }
        }

        if let Some(t) = self.model_temperature {
            if !(t.is_finite() && t > 0.0) {
                return Err(ConfigError::invalid(
                    Self::ENV_MODEL_TEMPERATURE,
                    t,
                    "must be a positive number",
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.mock_score) {
            return Err(ConfigError::invalid(
                Self::ENV_MOCK_SCORE,
                self.mock_score,
                "must be in [0, 1]",
            ));
        }

        if self.scorers.is_empty() {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_SCORERS,
            });
        }

        if self.scorers.contains(&ScorerKind::Sightengine) {
            if self.sightengine_user.is_none() {
                return Err(ConfigError::MissingEnvVar {
                    name: Self::ENV_SIGHTENGINE_USER,
                });
            }
            if self.sightengine_secret.is_none() {
                return Err(ConfigError::MissingEnvVar {
                    name: Self::ENV_SIGHTENGINE_SECRET,
                });
            }
        }

        if self.scorers.contains(&ScorerKind::Local) {
            let Some(ref path) = self.model_path else {
                return Err(ConfigError::MissingEnvVar {
                    name: Self::ENV_MODEL_PATH,
                });
            };
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.face_mode && self.face_locator_url.is_none() {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_FACE_LOCATOR_URL,
            });
        }

        if self.fusion == Some(FusionPolicy::MeanMax) && self.scorers.len() != 1 {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "mean-max fusion needs exactly one scorer, {} configured",
                    self.scorers.len()
                ),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn sampling_strategy(&self) -> SamplingStrategy {
        let count = match self.sample_ratio {
            Some(ratio) => SampleCount::Ratio {
                ratio,
                cap: self.sample_cap,
            },
            None => SampleCount::Fixed(self.sample_count),
        };
        match self.sampling {
            SamplingMode::PerSecond => SamplingStrategy::PerSecond,
            SamplingMode::Uniform => SamplingStrategy::Uniform {
                count,
                policy: UniformPolicy::Even,
            },
            SamplingMode::Random => SamplingStrategy::Uniform {
                count,
                policy: UniformPolicy::Random,
            },
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            strategy: self.sampling_strategy(),
            sequence_length: self.sequence_length,
            materialize: self.materialize_samples,
        }
    }

    /// The configured policy, or the one implied by the branch count.
    pub fn fusion_policy(&self) -> FusionPolicy {
        self.fusion
            .unwrap_or_else(|| FusionPolicy::for_branch_count(self.scorers.len()))
    }

    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_secs(self.scorer_timeout_secs)
    }

    pub fn decode_stall_timeout(&self) -> Duration {
        Duration::from_secs(self.decode_stall_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scratch_root: self.scratch_dir.clone(),
            digest: self.digest,
            cleanup: self.cleanup,
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_scorers_from_env(default: Vec<ScorerKind>) -> Result<Vec<ScorerKind>, ConfigError> {
        let Ok(value) = env::var(Self::ENV_SCORERS) else {
            return Ok(default);
        };

        let mut scorers = Vec::new();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: ScorerKind = name.parse().map_err(|reason| ConfigError::InvalidValue {
                name: Self::ENV_SCORERS,
                value: value.clone(),
                reason,
            })?;
            if !scorers.contains(&kind) {
                scorers.push(kind);
            }
        }
        Ok(scorers)
    }

    fn parse_named_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(Self::parse_optional_named_from_env(var_name)?.unwrap_or(default))
    }

    fn parse_optional_named_from_env<T>(var_name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name: var_name,
                    reason: e.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        Self::parse_optional_path_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_number_from_env<T: FromStr>(var_name: &str, default: T) -> T {
        Self::parse_optional_number_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_number_from_env<T: FromStr>(var_name: &str) -> Option<T> {
        env::var(var_name).ok().and_then(|v| v.trim().parse().ok())
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        match env::var(var_name)
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Ok("1" | "true" | "yes" | "on") => true,
            Ok("0" | "false" | "no" | "off") => false,
            _ => default,
        }
    }
}
