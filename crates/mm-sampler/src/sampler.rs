use crate::greedy::{DistSampler, GreedySampler};
use crate::temperature::TemperatureSampler;
use crate::top_k::TopKSampler;
use crate::top_p::TopPSampler;

/// A token ID paired with its logit value.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLogit {
    pub token_id: u32,
    pub logit: f32,
}

/// A stage of the sampling pipeline.
///
/// Filters (temperature, top-k, top-p) rewrite or prune the candidate list;
/// selectors (greedy, dist) shrink it to a single entry. `apply` takes
/// `&mut self` so selectors can advance their random state between steps.
pub trait Sampler: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&mut self, logits: &mut Vec<TokenLogit>);
}

/// Composes multiple samplers into a pipeline.
/// The last sampler in the chain should be a selector (greedy or dist).
#[derive(Default)]
pub struct SamplerChain {
    samplers: Vec<Box<dyn Sampler>>,
}

impl SamplerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sampler to the end of the chain. Returns self for builder-style usage.
    pub fn with(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Standard decoding pipeline.
    ///
    /// A non-positive temperature means greedy decoding and ignores the
    /// filters. Otherwise: temperature, then top-k (0 disables), then top-p
    /// (>= 1.0 disables), then a seeded draw from what is left.
    pub fn from_settings(temperature: f32, top_k: usize, top_p: f32, seed: u64) -> Self {
        if temperature <= 0.0 {
            return Self::new().with(Box::new(GreedySampler::new()));
        }

        let mut chain = Self::new().with(Box::new(TemperatureSampler::new(temperature)));
        if top_k > 0 {
            chain = chain.with(Box::new(TopKSampler::new(top_k)));
        }
        if top_p < 1.0 {
            chain = chain.with(Box::new(TopPSampler::new(top_p)));
        }
        chain.with(Box::new(DistSampler::new(seed)))
    }

    /// Names of the stages, in order.
    pub fn stages(&self) -> Vec<&str> {
        self.samplers.iter().map(|s| s.name()).collect()
    }

    /// Run all samplers in order over one row of raw logits and return the
    /// selected token ID, or `None` when `logits` is empty.
    pub fn sample(&mut self, logits: &[f32]) -> Option<u32> {
        let mut candidates: Vec<TokenLogit> = logits
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit {
                token_id: i as u32,
                logit,
            })
            .collect();

        for sampler in &mut self.samplers {
            sampler.apply(&mut candidates);
        }

        candidates.first().map(|t| t.token_id)
    }
}

/// Sort candidates by descending logit, NaNs last.
pub(crate) fn sort_descending(logits: &mut [TokenLogit]) {
    logits.sort_by(|a, b| b.logit.total_cmp(&a.logit));
}
