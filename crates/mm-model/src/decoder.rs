use mm_tensor::{ComputeBackend, DType, Tensor};
use tracing::{debug, info, trace};

use crate::architecture::ConditionalDecoder;
use crate::config::{DecoderConfig, PositionEncoding};
use crate::error::{ModelError, Result};
use crate::generation::{self, GenerateParams};
use crate::nn::{Attention, FeedForward, Linear, Norm, ParamInit};

/// Pre-norm decoder block: causal self-attention, optional cross-attention
/// into the encoder context, feed-forward. Each sub-layer is residual.
struct DecoderBlock {
    self_norm: Norm,
    self_attn: Attention,
    cross: Option<(Norm, Attention)>,
    ff_norm: Norm,
    ff: FeedForward,
}

impl DecoderBlock {
    fn new(cfg: &DecoderConfig, init: &mut ParamInit) -> Result<Self> {
        let rotary = cfg.position == PositionEncoding::Rotary;
        let self_attn = Attention::self_attention(cfg.dim, cfg.heads, true, rotary, init)?;
        let cross = if cfg.cross_attend {
            Some((
                Norm::new(cfg.norm, cfg.dim, cfg.norm_eps),
                Attention::cross_attention(cfg.dim, cfg.context_dim, cfg.heads, init)?,
            ))
        } else {
            None
        };
        Ok(Self {
            self_norm: Norm::new(cfg.norm, cfg.dim, cfg.norm_eps),
            self_attn,
            cross,
            ff_norm: Norm::new(cfg.norm, cfg.dim, cfg.norm_eps),
            ff: FeedForward::new(cfg.feed_forward, cfg.dim, cfg.ff_mult, init)?,
        })
    }

    fn forward(
        &self,
        hidden: Vec<f32>,
        context: Option<&[f32]>,
        batch: usize,
        backend: &dyn ComputeBackend,
    ) -> Result<Vec<f32>> {
        let normed = self.self_norm.forward(&hidden, backend)?;
        let mut hidden = backend.add(&hidden, &self.self_attn.forward(&normed, batch, backend)?)?;

        if let (Some((norm, attn)), Some(context)) = (&self.cross, context) {
            let normed = norm.forward(&hidden, backend)?;
            hidden = backend.add(&hidden, &attn.forward_cross(&normed, context, batch, backend)?)?;
        }

        let normed = self.ff_norm.forward(&hidden, backend)?;
        Ok(backend.add(&hidden, &self.ff.forward(&normed, backend)?)?)
    }
}

/// Autoregressive transformer decoder that cross-attends to an encoder
/// context.
///
/// Token embeddings (plus a scaled learned position table, unless rotary
/// embeddings are configured) pass through `depth` decoder blocks, a final
/// norm and a bias-free projection to vocabulary logits.
pub struct AutoregressiveDecoder {
    config: DecoderConfig,
    token_embedding: Vec<f32>,
    pos_embedding: Option<Vec<f32>>,
    blocks: Vec<DecoderBlock>,
    final_norm: Norm,
    to_logits: Linear,
}

impl AutoregressiveDecoder {
    pub fn new(config: DecoderConfig, init: &mut ParamInit) -> Result<Self> {
        config.validate()?;

        let token_embedding = init.embedding(config.vocab_size, config.dim)?;
        let pos_embedding = match config.position {
            PositionEncoding::Absolute => Some(init.embedding(config.max_seq_len, config.dim)?),
            PositionEncoding::Rotary => None,
        };
        let blocks = (0..config.depth)
            .map(|_| DecoderBlock::new(&config, init))
            .collect::<Result<Vec<_>>>()?;
        let final_norm = Norm::new(config.norm, config.dim, config.norm_eps);
        let to_logits = Linear::new(config.dim, config.vocab_size, false, init)?;

        info!(
            vocab_size = config.vocab_size,
            max_seq_len = config.max_seq_len,
            dim = config.dim,
            depth = config.depth,
            heads = config.heads,
            cross_attend = config.cross_attend,
            "decoder ready"
        );

        Ok(Self {
            config,
            token_embedding,
            pos_embedding,
            blocks,
            final_norm,
            to_logits,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Check a `(batch, seq_len)` token tensor. Returns `(batch, seq_len)`.
    pub fn validate_tokens(&self, tokens: &Tensor) -> Result<(usize, usize)> {
        let (batch, seq_len) = tokens.shape().dims2().map_err(|_| ModelError::InvalidRank {
            name: "token batch",
            expected: 2,
            got: tokens.dims().to_vec(),
        })?;
        if tokens.dtype() != DType::U32 {
            return Err(ModelError::InvalidDType {
                name: "token batch",
                expected: DType::U32.to_string(),
                got: tokens.dtype().to_string(),
            });
        }
        if batch == 0 {
            return Err(ModelError::EmptyBatch("token batch"));
        }
        if seq_len == 0 {
            return Err(ModelError::EmptySequence);
        }
        if seq_len > self.config.max_seq_len {
            return Err(ModelError::SequenceTooLong {
                len: seq_len,
                max: self.config.max_seq_len,
            });
        }

        let vocab_size = self.config.vocab_size;
        if let Some((position, &token)) = tokens
            .as_u32()?
            .iter()
            .enumerate()
            .find(|(_, t)| **t as usize >= vocab_size)
        {
            return Err(ModelError::TokenOutOfRange {
                token,
                position,
                vocab_size,
            });
        }
        Ok((batch, seq_len))
    }

    fn validate_context(&self, context: &Tensor, batch: usize) -> Result<()> {
        let (ctx_batch, ctx_len, width) = context.shape().dims3().map_err(|_| ModelError::InvalidRank {
            name: "context",
            expected: 3,
            got: context.dims().to_vec(),
        })?;
        if context.dtype() != DType::F32 {
            return Err(ModelError::InvalidDType {
                name: "context",
                expected: DType::F32.to_string(),
                got: context.dtype().to_string(),
            });
        }
        if !self.config.cross_attend {
            return Err(ModelError::InvalidConfig(
                "decoder was built without cross-attention but received a context".to_string(),
            ));
        }
        if ctx_batch != batch {
            return Err(ModelError::BatchMismatch {
                images: ctx_batch,
                tokens: batch,
            });
        }
        if ctx_len == 0 {
            return Err(ModelError::EmptyContext);
        }
        if width != self.config.context_dim {
            return Err(ModelError::ContextMismatch {
                expected: self.config.context_dim,
                got: width,
            });
        }
        Ok(())
    }

    /// Look up token embeddings and add the scaled position table.
    fn embed(&self, ids: &[u32], seq_len: usize) -> Vec<f32> {
        let dim = self.config.dim;
        let mut hidden = Vec::with_capacity(ids.len() * dim);
        for &id in ids {
            let offset = id as usize * dim;
            hidden.extend_from_slice(&self.token_embedding[offset..offset + dim]);
        }

        if let Some(table) = &self.pos_embedding {
            let scale = (dim as f32).powf(-0.5);
            for (row, chunk) in hidden.chunks_mut(dim).enumerate() {
                let pos = row % seq_len;
                let pos_row = &table[pos * dim..(pos + 1) * dim];
                for (h, p) in chunk.iter_mut().zip(pos_row) {
                    *h += p * scale;
                }
            }
        }
        hidden
    }

    /// Logits of shape `(batch, seq_len, vocab_size)` for every position.
    ///
    /// Position `i` depends only on tokens `0..=i` of its own sequence and on
    /// the whole context. A context with no positions is rejected.
    pub fn decode(
        &self,
        tokens: &Tensor,
        context: Option<&Tensor>,
        backend: &dyn ComputeBackend,
    ) -> Result<Tensor> {
        let (batch, seq_len) = self.validate_tokens(tokens)?;
        let context = match context {
            Some(ctx) => {
                self.validate_context(ctx, batch)?;
                Some(ctx.as_f32()?)
            }
            None => None,
        };
        debug!(batch, seq_len, with_context = context.is_some(), "decoding");

        let mut hidden = self.embed(tokens.as_u32()?, seq_len);
        for (i, block) in self.blocks.iter().enumerate() {
            trace!(layer = i, "decoder block");
            hidden = block.forward(hidden, context, batch, backend)?;
        }

        let normed = self.final_norm.forward(&hidden, backend)?;
        let logits = self.to_logits.forward(&normed, backend)?;
        Ok(Tensor::from_f32(
            logits,
            [batch, seq_len, self.config.vocab_size],
        )?)
    }

    /// Sample a continuation of `prompt`; see [`generation::generate`].
    pub fn generate(
        &self,
        prompt: &[u32],
        context: Option<&Tensor>,
        params: &GenerateParams,
        backend: &dyn ComputeBackend,
    ) -> Result<Vec<u32>> {
        generation::generate(self, prompt, context, params, backend)
    }
}

impl ConditionalDecoder for AutoregressiveDecoder {
    fn decode(
        &self,
        tokens: &Tensor,
        context: Option<&Tensor>,
        backend: &dyn ComputeBackend,
    ) -> Result<Tensor> {
        AutoregressiveDecoder::decode(self, tokens, context, backend)
    }

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn max_seq_len(&self) -> usize {
        self.config.max_seq_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedForwardKind, NormKind};
    use mm_tensor::CpuBackend;

    fn small_config() -> DecoderConfig {
        DecoderConfig {
            vocab_size: 50,
            max_seq_len: 16,
            dim: 16,
            depth: 2,
            heads: 2,
            ff_mult: 2,
            cross_attend: true,
            context_dim: 8,
            ..DecoderConfig::default()
        }
    }

    fn decoder(config: DecoderConfig) -> AutoregressiveDecoder {
        AutoregressiveDecoder::new(config, &mut ParamInit::new(3)).unwrap()
    }

    fn context(batch: usize, seed: u64) -> Tensor {
        Tensor::randn([batch, 4, 8], 0.0, 1.0, seed).unwrap()
    }

    #[test]
    fn test_logits_shape() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());
        let tokens = Tensor::rand_tokens([2, 5], 50, 1).unwrap();
        let logits = dec.decode(&tokens, Some(&context(2, 2)), &backend).unwrap();
        assert_eq!(logits.dims(), &[2, 5, 50]);
        assert!(logits.as_f32().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_causal_positions_ignore_future_tokens() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());
        let ctx = context(1, 2);

        let a = Tensor::from_u32(vec![1, 2, 3, 4], [1, 4]).unwrap();
        let b = Tensor::from_u32(vec![1, 2, 3, 40], [1, 4]).unwrap();
        let la = dec.decode(&a, Some(&ctx), &backend).unwrap();
        let lb = dec.decode(&b, Some(&ctx), &backend).unwrap();

        let (la, lb) = (la.as_f32().unwrap(), lb.as_f32().unwrap());
        assert_eq!(&la[..3 * 50], &lb[..3 * 50]);
        assert_ne!(&la[3 * 50..], &lb[3 * 50..]);
    }

    #[test]
    fn test_context_conditions_every_position() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());
        let tokens = Tensor::from_u32(vec![5, 6], [1, 2]).unwrap();
        let la = dec.decode(&tokens, Some(&context(1, 2)), &backend).unwrap();
        let lb = dec.decode(&tokens, Some(&context(1, 9)), &backend).unwrap();
        let (la, lb) = (la.as_f32().unwrap(), lb.as_f32().unwrap());
        assert_ne!(&la[..50], &lb[..50]);
        assert_ne!(&la[50..], &lb[50..]);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let backend = CpuBackend::new();
        let a = decoder(small_config());
        let b = decoder(small_config());
        let tokens = Tensor::rand_tokens([1, 6], 50, 4).unwrap();
        let ctx = context(1, 5);
        assert_eq!(
            a.decode(&tokens, Some(&ctx), &backend).unwrap(),
            b.decode(&tokens, Some(&ctx), &backend).unwrap()
        );
    }

    #[test]
    fn test_rotary_swiglu_rmsnorm_variant() {
        let backend = CpuBackend::new();
        let dec = decoder(DecoderConfig {
            norm: NormKind::RmsNorm,
            feed_forward: FeedForwardKind::SwiGlu,
            position: PositionEncoding::Rotary,
            ..small_config()
        });
        let tokens = Tensor::rand_tokens([1, 3], 50, 4).unwrap();
        let logits = dec.decode(&tokens, Some(&context(1, 1)), &backend).unwrap();
        assert_eq!(logits.dims(), &[1, 3, 50]);
    }

    #[test]
    fn test_decodes_without_context() {
        let backend = CpuBackend::new();
        let dec = decoder(DecoderConfig {
            cross_attend: false,
            ..small_config()
        });
        let tokens = Tensor::rand_tokens([1, 3], 50, 4).unwrap();
        assert_eq!(dec.decode(&tokens, None, &backend).unwrap().dims(), &[1, 3, 50]);
        assert!(matches!(
            dec.decode(&tokens, Some(&context(1, 1)), &backend),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_token_validation() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());

        let empty = Tensor::from_u32(vec![], [1, 0]).unwrap();
        assert!(matches!(
            dec.decode(&empty, None, &backend),
            Err(ModelError::EmptySequence)
        ));

        let floats = Tensor::zeros([1, 4]);
        assert!(matches!(
            dec.decode(&floats, None, &backend),
            Err(ModelError::InvalidDType { .. })
        ));

        let flat = Tensor::from_u32(vec![1, 2], [2]).unwrap();
        assert!(matches!(
            dec.decode(&flat, None, &backend),
            Err(ModelError::InvalidRank { expected: 2, .. })
        ));

        let long = Tensor::from_u32(vec![0; 17], [1, 17]).unwrap();
        assert!(matches!(
            dec.decode(&long, None, &backend),
            Err(ModelError::SequenceTooLong { len: 17, max: 16 })
        ));

        let oov = Tensor::from_u32(vec![1, 50], [1, 2]).unwrap();
        assert!(matches!(
            dec.decode(&oov, None, &backend),
            Err(ModelError::TokenOutOfRange {
                token: 50,
                position: 1,
                vocab_size: 50
            })
        ));
    }

    #[test]
    fn test_context_validation() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());
        let tokens = Tensor::rand_tokens([1, 3], 50, 4).unwrap();

        assert!(matches!(
            dec.decode(&tokens, Some(&context(2, 1)), &backend),
            Err(ModelError::BatchMismatch { images: 2, tokens: 1 })
        ));
        let wide = Tensor::zeros([1, 4, 12]);
        assert!(matches!(
            dec.decode(&tokens, Some(&wide), &backend),
            Err(ModelError::ContextMismatch { expected: 8, got: 12 })
        ));
    }

    #[test]
    fn test_empty_context_is_rejected() {
        let backend = CpuBackend::new();
        let dec = decoder(small_config());
        let tokens = Tensor::from_u32(vec![1, 2], [1, 2]).unwrap();
        let empty = Tensor::from_f32(vec![], [1, 0, 8]).unwrap();

        let err = dec.decode(&tokens, Some(&empty), &backend).unwrap_err();
        assert!(matches!(err, ModelError::EmptyContext));
        assert!(err.is_validation());
    }
}
