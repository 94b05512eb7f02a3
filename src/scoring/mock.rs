use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::media::Sample;

use super::error::ScoringError;
use super::scorer::Scorer;
use super::types::RawScore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockResponse {
    Score(RawScore),
    Unavailable,
    Rejected,
    /// Never answers. Exercises the per-call timeout.
    Hang,
}

/// Scripted scorer keyed by sample id, with a default for unscripted samples.
///
/// Selectable as the `mock` backend so the service runs without credentials or weights.
#[derive(Debug)]
pub struct MockScorer {
    default: MockResponse,
    by_sample: HashMap<usize, MockResponse>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockScorer {
    pub fn new(default: MockResponse) -> Self {
        Self {
            default,
            by_sample: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Same probability for every sample.
    pub fn constant(probability: f64) -> Self {
        Self::new(MockResponse::Score(RawScore::probability(probability)))
    }

    /// Probabilities by sample id, in order.
    pub fn sequence(probabilities: &[f64]) -> Self {
        probabilities
            .iter()
            .enumerate()
            .fold(Self::new(MockResponse::Rejected), |scorer, (id, p)| {
                scorer.with_response(id, MockResponse::Score(RawScore::probability(*p)))
            })
    }

    pub fn unavailable() -> Self {
        Self::new(MockResponse::Unavailable)
    }

    pub fn with_response(mut self, sample_id: usize, response: MockResponse) -> Self {
        self.by_sample.insert(sample_id, response);
        self
    }

    /// Sleeps before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for MockScorer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn score(&self, sample: &Sample) -> Result<RawScore, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .by_sample
            .get(&sample.id())
            .copied()
            .unwrap_or(self.default);

        match response {
            MockResponse::Score(raw) => Ok(raw),
            MockResponse::Unavailable => Err(ScoringError::unavailable("mock backend offline")),
            MockResponse::Rejected => Err(ScoringError::rejected("mock backend refused sample")),
            MockResponse::Hang => std::future::pending().await,
        }
    }
}
