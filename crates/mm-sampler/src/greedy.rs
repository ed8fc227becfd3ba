use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::sampler::{sort_descending, Sampler, TokenLogit};

/// Greedy sampler: selects the single token with the highest logit.
#[derive(Debug, Default)]
pub struct GreedySampler;

impl GreedySampler {
    pub fn new() -> Self {
        Self
    }
}

impl Sampler for GreedySampler {
    fn name(&self) -> &str {
        "greedy"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        sort_descending(logits);
        logits.truncate(1);
    }
}

/// Distribution-based sampler: softmax over the surviving candidates, then a
/// draw from a seeded RNG. The RNG persists across calls, so successive
/// generation steps see different draws while the whole run stays
/// reproducible for a given seed.
pub struct DistSampler {
    rng: StdRng,
}

impl DistSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for DistSampler {
    fn name(&self) -> &str {
        "dist"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if logits.is_empty() {
            return;
        }

        let max_logit = logits
            .iter()
            .map(|t| t.logit)
            .fold(f32::NEG_INFINITY, f32::max);
        let weights: Vec<f32> = logits.iter().map(|t| (t.logit - max_logit).exp()).collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => {
                let selected = logits[dist.sample(&mut self.rng)].clone();
                logits.clear();
                logits.push(selected);
            }
            // All weights zero or non-finite: fall back to the best logit.
            Err(_) => {
                sort_descending(logits);
                logits.truncate(1);
            }
        }
    }
}
