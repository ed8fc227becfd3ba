use mm_tensor::{AttentionShape, ComputeBackend};

use super::{row_count, Linear, ParamInit};
use crate::error::Result;

/// Multi-head attention sub-layer.
///
/// Queries come from the block input; keys and values come either from the
/// same input (self-attention) or from an encoder context (cross-attention).
/// Projections carry no bias.
pub struct Attention {
    to_q: Linear,
    to_k: Linear,
    to_v: Linear,
    to_out: Linear,
    n_heads: usize,
    head_dim: usize,
    causal: bool,
    rotary: bool,
}

impl Attention {
    /// Self-attention over `dim`-wide rows, optionally causal and rotary.
    pub fn self_attention(
        dim: usize,
        n_heads: usize,
        causal: bool,
        rotary: bool,
        init: &mut ParamInit,
    ) -> Result<Self> {
        Self::build(dim, dim, n_heads, causal, rotary, init)
    }

    /// Cross-attention from `dim`-wide queries into `context_dim`-wide keys
    /// and values. Every query sees the whole context.
    pub fn cross_attention(
        dim: usize,
        context_dim: usize,
        n_heads: usize,
        init: &mut ParamInit,
    ) -> Result<Self> {
        Self::build(dim, context_dim, n_heads, false, false, init)
    }

    fn build(
        dim: usize,
        kv_dim: usize,
        n_heads: usize,
        causal: bool,
        rotary: bool,
        init: &mut ParamInit,
    ) -> Result<Self> {
        let head_dim = dim / n_heads;
        let inner = n_heads * head_dim;
        Ok(Self {
            to_q: Linear::new(dim, inner, false, init)?,
            to_k: Linear::new(kv_dim, inner, false, init)?,
            to_v: Linear::new(kv_dim, inner, false, init)?,
            to_out: Linear::new(inner, dim, false, init)?,
            n_heads,
            head_dim,
            causal,
            rotary,
        })
    }

    /// Self-attention over `batch` sequences stacked in `x`.
    pub fn forward(&self, x: &[f32], batch: usize, backend: &dyn ComputeBackend) -> Result<Vec<f32>> {
        let seq_len = row_count(x, self.to_q.in_dim(), "self-attention")? / batch.max(1);
        let mut q = self.to_q.forward(x, backend)?;
        let mut k = self.to_k.forward(x, backend)?;
        let v = self.to_v.forward(x, backend)?;

        if self.rotary {
            q = backend.rope(&q, self.n_heads, self.head_dim, seq_len, 0)?;
            k = backend.rope(&k, self.n_heads, self.head_dim, seq_len, 0)?;
        }

        let shape = AttentionShape {
            batch,
            n_heads: self.n_heads,
            head_dim: self.head_dim,
            q_len: seq_len,
            kv_len: seq_len,
        };
        let out = backend.attention(&q, &k, &v, shape, self.causal)?;
        self.to_out.forward(&out, backend)
    }

    /// Cross-attention from `x` into `context`, both stacked over `batch`.
    pub fn forward_cross(
        &self,
        x: &[f32],
        context: &[f32],
        batch: usize,
        backend: &dyn ComputeBackend,
    ) -> Result<Vec<f32>> {
        let q_len = row_count(x, self.to_q.in_dim(), "cross-attention")? / batch.max(1);
        let kv_len = row_count(context, self.to_k.in_dim(), "cross-attention context")? / batch.max(1);

        let q = self.to_q.forward(x, backend)?;
        let k = self.to_k.forward(context, backend)?;
        let v = self.to_v.forward(context, backend)?;

        let shape = AttentionShape {
            batch,
            n_heads: self.n_heads,
            head_dim: self.head_dim,
            q_len,
            kv_len,
        };
        let out = backend.attention(&q, &k, &v, shape, false)?;
        self.to_out.forward(&out, backend)
    }
}
