use std::fmt::Debug;

use crate::error::Result;

/// Geometry of a multi-head attention call.
///
/// Queries are laid out as `[batch, q_len, n_heads * head_dim]`, keys and
/// values as `[batch, kv_len, n_heads * head_dim]`, all row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttentionShape {
    pub batch: usize,
    pub n_heads: usize,
    pub head_dim: usize,
    pub q_len: usize,
    pub kv_len: usize,
}

impl AttentionShape {
    /// Width of one projected row, `n_heads * head_dim`.
    pub fn row_width(&self) -> usize {
        self.n_heads * self.head_dim
    }
}

/// Trait for pluggable compute backends (CPU, GPU, etc.).
///
/// All operations work on f32 slices. Data is passed in as slices and
/// returned as owned vectors. The backend is responsible for performing the
/// computation and returning the result.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>>;

    /// Element-wise addition: result[i] = a[i] + b[i].
    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Row broadcast addition: adds `row` to every consecutive chunk of
    /// `row.len()` elements in `x`. Used for biases and positional tables.
    fn add_row(&self, x: &[f32], row: &[f32]) -> Result<Vec<f32>>;

    /// Element-wise multiplication: result[i] = a[i] * b[i].
    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Scalar multiplication: result[i] = a[i] * s.
    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>>;

    /// RMS normalization.
    ///
    /// For each row of `hidden_size` elements in `x`:
    ///   rms = sqrt(mean(x^2) + eps)
    ///   result[i] = x[i] * weight[i] / rms
    fn rms_norm(
        &self,
        x: &[f32],
        weight: &[f32],
        eps: f32,
        hidden_size: usize,
    ) -> Result<Vec<f32>>;

    /// Layer normalization.
    ///
    /// For each row of `hidden_size` elements in `x`:
    ///   result[i] = (x[i] - mean) / sqrt(var + eps) * weight[i] + bias[i]
    fn layer_norm(
        &self,
        x: &[f32],
        weight: &[f32],
        bias: &[f32],
        eps: f32,
        hidden_size: usize,
    ) -> Result<Vec<f32>>;

    /// Rotary Position Embedding (RoPE).
    ///
    /// `x` holds rows of `n_heads * head_dim` elements; row `r` is rotated
    /// for position `pos_offset + r` (modulo `rows_per_sequence`, so a
    /// batch of sequences restarts at `pos_offset` for each sequence).
    fn rope(
        &self,
        x: &[f32],
        n_heads: usize,
        head_dim: usize,
        rows_per_sequence: usize,
        pos_offset: usize,
    ) -> Result<Vec<f32>>;

    /// SiLU activation: result[i] = x[i] * sigmoid(x[i]).
    fn silu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// GELU activation (tanh approximation).
    fn gelu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Scaled dot-product attention over every (batch, head) pair.
    ///
    /// With `causal`, query `i` only attends to keys `j <= i`; this requires
    /// `q_len == kv_len`. Returns data laid out like `q`.
    fn attention(
        &self,
        q: &[f32],
        k: &[f32],
        v: &[f32],
        shape: AttentionShape,
        causal: bool,
    ) -> Result<Vec<f32>>;
}
