//! Cost-bounded sample selection.
//!
//! Scoring calls cost money and latency, so at most `max_count` samples leave the
//! sampler. Oversized sets are cut down to a uniformly random subset so no temporal
//! region is systematically favoured. The subset keeps the input's relative order.
//!
//! The sampler applies the same rule to candidate frame indices before decoding, so
//! frames outside the budget are never decoded at all.


use rand::Rng;
use rand::seq::index;
use tracing::info;

use crate::constants::DEFAULT_MAX_SAMPLES;
use crate::media::SampleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBudgeter {
    max_count: usize,
}

impl Default for SampleBudgeter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

impl SampleBudgeter {
    /// `max_count` is raised to 1 if zero.
    pub fn new(max_count: usize) -> Self {
        Self {
            max_count: max_count.max(1),
        }
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Returns `items` unchanged when within budget, otherwise a uniformly random
    /// subset of exactly `max_count` of them in their original order.
    pub fn select<T, R: Rng + ?Sized>(&self, items: Vec<T>, rng: &mut R) -> Vec<T> {
        if items.len() <= self.max_count {
            return items;
        }

        let mut keep = vec![false; items.len()];
        for i in index::sample(rng, items.len(), self.max_count).iter() {
            keep[i] = true;
        }
        items
            .into_iter()
            .zip(keep)
            .filter_map(|(item, kept)| kept.then_some(item))
            .collect()
    }

    /// Returns `samples` unchanged when within budget, otherwise a random subset of
    /// exactly `max_count` distinct samples.
    pub fn limit<R: Rng + ?Sized>(&self, samples: SampleSet, rng: &mut R) -> SampleSet {
        if samples.len() <= self.max_count {
            return samples;
        }

        let extracted = samples.len();
        let candidates = samples.candidates();
        let selected = self.select(samples.into_vec(), rng);

        info!(
            extracted = extracted,
            selected = selected.len(),
            "Budget applied: selected random subset of samples"
        );
        SampleSet::new(selected).with_candidates(candidates)
    }
}
