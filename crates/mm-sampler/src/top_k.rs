use crate::sampler::{sort_descending, Sampler, TokenLogit};

/// Keeps only the `k` highest-logit tokens.
pub struct TopKSampler {
    k: usize,
}

impl TopKSampler {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Sampler for TopKSampler {
    fn name(&self) -> &str {
        "top_k"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if self.k == 0 || self.k >= logits.len() {
            return;
        }
        sort_descending(logits);
        logits.truncate(self.k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_top_k() {
        let mut logits: Vec<TokenLogit> = [0.1, 0.9, 0.5, 0.7]
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit { token_id: i as u32, logit })
            .collect();
        TopKSampler::new(2).apply(&mut logits);
        let ids: Vec<u32> = logits.iter().map(|t| t.token_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
