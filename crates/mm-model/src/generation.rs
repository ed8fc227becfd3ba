use mm_sampler::SamplerChain;
use mm_tensor::{ComputeBackend, Tensor};
use tracing::debug;

use crate::architecture::ConditionalDecoder;
use crate::error::{ModelError, Result};

/// Sampling settings for [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    /// Upper bound on the number of tokens appended to the prompt.
    pub max_new_tokens: usize,
    /// Softmax temperature; `<= 0.0` selects greedy decoding.
    pub temperature: f32,
    /// Keep only the `top_k` most likely tokens (0 disables).
    pub top_k: usize,
    /// Nucleus threshold (>= 1.0 disables).
    pub top_p: f32,
    pub seed: u64,
    /// Stop as soon as this token is produced. It is included in the output.
    pub eos_id: Option<u32>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 32,
            temperature: 1.0,
            top_k: 0,
            top_p: 1.0,
            seed: 0,
            eos_id: None,
        }
    }
}

/// Extend `prompt` one token at a time.
///
/// Each step runs the full decoder over the most recent `max_seq_len` tokens
/// and samples from the logits of the last position. `context`, when given,
/// must hold a single sequence. Returns only the newly generated tokens.
pub fn generate(
    decoder: &dyn ConditionalDecoder,
    prompt: &[u32],
    context: Option<&Tensor>,
    params: &GenerateParams,
    backend: &dyn ComputeBackend,
) -> Result<Vec<u32>> {
    if prompt.is_empty() {
        return Err(ModelError::EmptySequence);
    }

    let vocab_size = decoder.vocab_size();
    let window = decoder.max_seq_len();
    let mut chain = SamplerChain::from_settings(params.temperature, params.top_k, params.top_p, params.seed);
    debug!(
        prompt_len = prompt.len(),
        max_new_tokens = params.max_new_tokens,
        stages = ?chain.stages(),
        "starting generation"
    );

    let mut sequence = prompt.to_vec();
    let mut generated = Vec::with_capacity(params.max_new_tokens);

    for _ in 0..params.max_new_tokens {
        let start = sequence.len().saturating_sub(window);
        let visible = &sequence[start..];
        let tokens = Tensor::from_u32(visible.to_vec(), [1, visible.len()])?;

        let logits = decoder.decode(&tokens, context, backend)?;
        let logits = logits.as_f32()?;
        let last = &logits[logits.len() - vocab_size..];

        let next = chain
            .sample(last)
            .ok_or_else(|| ModelError::Generation("sampler produced no token".to_string()))?;
        sequence.push(next);
        generated.push(next);

        if params.eos_id == Some(next) {
            debug!(steps = generated.len(), "hit end of sequence");
            break;
        }
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::decoder::AutoregressiveDecoder;
    use crate::nn::ParamInit;
    use mm_tensor::CpuBackend;

    /// Decoder that always favours `(last token + 1) % vocab`.
    struct Counter {
        vocab: usize,
        max_seq_len: usize,
    }

    impl ConditionalDecoder for Counter {
        fn decode(
            &self,
            tokens: &Tensor,
            _context: Option<&Tensor>,
            _backend: &dyn ComputeBackend,
        ) -> Result<Tensor> {
            let ids = tokens.as_u32()?;
            assert!(ids.len() <= self.max_seq_len);
            let mut logits = vec![0.0; ids.len() * self.vocab];
            for (pos, &id) in ids.iter().enumerate() {
                logits[pos * self.vocab + (id as usize + 1) % self.vocab] = 10.0;
            }
            Ok(Tensor::from_f32(logits, [1, ids.len(), self.vocab])?)
        }

        fn vocab_size(&self) -> usize {
            self.vocab
        }

        fn max_seq_len(&self) -> usize {
            self.max_seq_len
        }
    }

    fn greedy(max_new_tokens: usize) -> GenerateParams {
        GenerateParams {
            max_new_tokens,
            temperature: 0.0,
            ..GenerateParams::default()
        }
    }

    #[test]
    fn test_greedy_follows_logits() {
        let backend = CpuBackend::new();
        let dec = Counter { vocab: 5, max_seq_len: 3 };
        // Longer than the window: only the tail is fed back.
        let out = generate(&dec, &[0, 1, 2], None, &greedy(6), &backend).unwrap();
        assert_eq!(out, vec![3, 4, 0, 1, 2, 3]);
    }

    #[test]
    fn test_stops_at_eos() {
        let backend = CpuBackend::new();
        let dec = Counter { vocab: 10, max_seq_len: 8 };
        let params = GenerateParams {
            eos_id: Some(4),
            ..greedy(20)
        };
        assert_eq!(generate(&dec, &[1], None, &params, &backend).unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn test_empty_prompt_is_rejected() {
        let backend = CpuBackend::new();
        let dec = Counter { vocab: 10, max_seq_len: 8 };
        assert!(matches!(
            generate(&dec, &[], None, &greedy(3), &backend),
            Err(ModelError::EmptySequence)
        ));
    }

    #[test]
    fn test_sampled_generation_is_seeded() {
        let backend = CpuBackend::new();
        let config = DecoderConfig {
            vocab_size: 30,
            max_seq_len: 8,
            dim: 16,
            depth: 1,
            heads: 2,
            ff_mult: 2,
            cross_attend: false,
            ..DecoderConfig::default()
        };
        let dec = AutoregressiveDecoder::new(config, &mut ParamInit::new(1)).unwrap();
        let params = GenerateParams {
            max_new_tokens: 10,
            temperature: 0.8,
            top_k: 10,
            top_p: 0.9,
            seed: 42,
            eos_id: None,
        };

        let a = dec.generate(&[1, 2], None, &params, &backend).unwrap();
        let b = dec.generate(&[1, 2], None, &params, &backend).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert!(a.iter().all(|&t| t < 30));
    }
}
