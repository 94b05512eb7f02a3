use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::constants::DEFAULT_SCORER_TIMEOUT_SECS;
use crate::media::Sample;

use super::error::ScoringError;
use super::scorer::Scorer;
use super::types::RawScore;

pub const DEFAULT_SIGHTENGINE_URL: &str = "https://api.sightengine.com/1.0/check.json";

#[derive(Clone)]
pub struct SightengineConfig {
    pub api_url: String,
    pub api_user: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SightengineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SightengineConfig")
            .field("api_url", &self.api_url)
            .field("api_user", &self.api_user)
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SightengineConfig {
    pub fn new(api_user: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_SIGHTENGINE_URL.to_string(),
            api_user: api_user.into(),
            api_secret: api_secret.into(),
            timeout: Duration::from_secs(DEFAULT_SCORER_TIMEOUT_SECS),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    status: String,
    #[serde(rename = "type")]
    kind: Option<TypeScores>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct TypeScores {
    ai_generated: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Remote `genai` check. Uploads each sample as JPEG and reads back a probability.
#[derive(Debug)]
pub struct SightengineScorer {
    config: SightengineConfig,
    http: HttpClient,
}

impl SightengineScorer {
    pub fn new(config: SightengineConfig) -> Result<Self, ScoringError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScoringError::ModelLoadFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SightengineConfig {
        &self.config
    }
}

#[async_trait]
impl Scorer for SightengineScorer {
    fn name(&self) -> &str {
        "sightengine"
    }

    async fn score(&self, sample: &Sample) -> Result<RawScore, ScoringError> {
        let owned = sample.clone();
        let jpeg = tokio::task::spawn_blocking(move || owned.encode_jpeg())
            .await
            .map_err(|e| ScoringError::rejected(format!("encode task failed: {e}")))?
            .map_err(|e| ScoringError::rejected(e.to_string()))?;

        let media = Part::bytes(jpeg)
            .file_name(format!("sample_{}.jpg", sample.id()))
            .mime_str("image/jpeg")
            .map_err(|e| ScoringError::rejected(e.to_string()))?;

        let form = Form::new()
            .part("media", media)
            .text("models", "genai")
            .text("api_user", self.config.api_user.clone())
            .text("api_secret", self.config.api_secret.clone());

        let resp = self
            .http
            .post(&self.config.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScoringError::unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(ScoringError::unavailable(format!("backend returned {status}")));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| ScoringError::unavailable(format!("failed to read body: {e}")))?;

        let probability = parse_check_response(&body)?;
        debug!(sample = sample.id(), probability = probability, "Sightengine score");
        Ok(RawScore::probability(probability))
    }
}

/// Extracts `type.ai_generated` from a check response.
pub(crate) fn parse_check_response(body: &[u8]) -> Result<f64, ScoringError> {
    let parsed: CheckResponse = serde_json::from_slice(body)
        .map_err(|e| ScoringError::rejected(format!("malformed response: {e}")))?;

    if parsed.status != "success" {
        let message = parsed
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("status {}", parsed.status));
        return Err(ScoringError::rejected(message));
    }

    match parsed.kind.and_then(|t| t.ai_generated) {
        Some(p) if (0.0..=1.0).contains(&p) => Ok(p),
        Some(p) => Err(ScoringError::rejected(format!(
            "probability {p} outside [0, 1]"
        ))),
        None => Err(ScoringError::rejected("response missing type.ai_generated")),
    }
}
