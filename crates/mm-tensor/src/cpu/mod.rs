mod attention;
mod matmul;
mod unary;

use crate::backend::{AttentionShape, ComputeBackend};
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Matmul rows and attention heads are spread over the rayon thread pool;
/// everything else is a straightforward loop.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_rows(op: &str, len: usize, row: usize) -> Result<()> {
    if row == 0 {
        return Err(TensorError::Other(format!("{op}: row size must be > 0")));
    }
    if len % row != 0 {
        return Err(TensorError::Other(format!(
            "{op}: x.len()={len} is not a multiple of {row}"
        )));
    }
    Ok(())
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>> {
        if a.len() != m * k {
            return Err(TensorError::Other(format!(
                "matmul: a.len()={} but expected m*k={}",
                a.len(),
                m * k
            )));
        }
        if b.len() != k * n {
            return Err(TensorError::Other(format!(
                "matmul: b.len()={} but expected k*n={}",
                b.len(),
                k * n
            )));
        }
        Ok(matmul::matmul_rows(a, b, m, k, n))
    }

    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        if a.len() != b.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![a.len()],
                got: vec![b.len()],
            });
        }
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
    }

    fn add_row(&self, x: &[f32], row: &[f32]) -> Result<Vec<f32>> {
        check_rows("add_row", x.len(), row.len())?;
        Ok(x
            .chunks_exact(row.len())
            .flat_map(|chunk| chunk.iter().zip(row).map(|(a, b)| a + b))
            .collect())
    }

    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        if a.len() != b.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![a.len()],
                got: vec![b.len()],
            });
        }
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    }

    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>> {
        Ok(a.iter().map(|x| x * s).collect())
    }

    fn rms_norm(
        &self,
        x: &[f32],
        weight: &[f32],
        eps: f32,
        hidden_size: usize,
    ) -> Result<Vec<f32>> {
        if weight.len() != hidden_size {
            return Err(TensorError::Other(format!(
                "rms_norm: weight.len()={} but hidden_size={}",
                weight.len(),
                hidden_size
            )));
        }
        check_rows("rms_norm", x.len(), hidden_size)?;

        let mut result = Vec::with_capacity(x.len());
        for row in x.chunks_exact(hidden_size) {
            let mean_sq: f32 = row.iter().map(|v| v * v).sum::<f32>() / hidden_size as f32;
            let rms = (mean_sq + eps).sqrt();
            result.extend(row.iter().zip(weight).map(|(v, w)| v * w / rms));
        }
        Ok(result)
    }

    fn layer_norm(
        &self,
        x: &[f32],
        weight: &[f32],
        bias: &[f32],
        eps: f32,
        hidden_size: usize,
    ) -> Result<Vec<f32>> {
        if weight.len() != hidden_size || bias.len() != hidden_size {
            return Err(TensorError::Other(format!(
                "layer_norm: weight.len()={} bias.len()={} but hidden_size={}",
                weight.len(),
                bias.len(),
                hidden_size
            )));
        }
        check_rows("layer_norm", x.len(), hidden_size)?;

        let mut result = Vec::with_capacity(x.len());
        for row in x.chunks_exact(hidden_size) {
            let mean = row.iter().sum::<f32>() / hidden_size as f32;
            let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / hidden_size as f32;
            let inv_std = 1.0 / (var + eps).sqrt();
            result.extend(
                row.iter()
                    .zip(weight.iter().zip(bias))
                    .map(|(v, (w, b))| (v - mean) * inv_std * w + b),
            );
        }
        Ok(result)
    }

    fn rope(
        &self,
        x: &[f32],
        n_heads: usize,
        head_dim: usize,
        rows_per_sequence: usize,
        pos_offset: usize,
    ) -> Result<Vec<f32>> {
        if head_dim % 2 != 0 {
            return Err(TensorError::Other(format!(
                "rope: head_dim={} must be even",
                head_dim
            )));
        }
        if rows_per_sequence == 0 {
            return Err(TensorError::Other(
                "rope: rows_per_sequence must be > 0".to_string(),
            ));
        }
        let width = n_heads * head_dim;
        check_rows("rope", x.len(), width)?;

        let mut out = x.to_vec();
        for (r, row) in out.chunks_exact_mut(width).enumerate() {
            let pos = (pos_offset + r % rows_per_sequence) as f32;
            for head in row.chunks_exact_mut(head_dim) {
                for i in 0..head_dim / 2 {
                    let theta = pos * (1.0 / 10000.0f32.powf(2.0 * i as f32 / head_dim as f32));
                    let (sin_theta, cos_theta) = theta.sin_cos();
                    let x0 = head[2 * i];
                    let x1 = head[2 * i + 1];
                    head[2 * i] = x0 * cos_theta - x1 * sin_theta;
                    head[2 * i + 1] = x0 * sin_theta + x1 * cos_theta;
                }
            }
        }
        Ok(out)
    }

    fn silu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(unary::silu(x))
    }

    fn gelu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(unary::gelu(x))
    }

    fn attention(
        &self,
        q: &[f32],
        k: &[f32],
        v: &[f32],
        shape: AttentionShape,
        causal: bool,
    ) -> Result<Vec<f32>> {
        let width = shape.row_width();
        if width == 0 {
            return Err(TensorError::Other(
                "attention: n_heads * head_dim must be > 0".to_string(),
            ));
        }
        let q_expected = shape.batch * shape.q_len * width;
        let kv_expected = shape.batch * shape.kv_len * width;
        if q.len() != q_expected {
            return Err(TensorError::ShapeMismatch {
                expected: vec![shape.batch, shape.q_len, width],
                got: vec![q.len()],
            });
        }
        if k.len() != kv_expected || v.len() != kv_expected {
            return Err(TensorError::ShapeMismatch {
                expected: vec![shape.batch, shape.kv_len, width],
                got: vec![k.len(), v.len()],
            });
        }
        if causal && shape.q_len != shape.kv_len {
            return Err(TensorError::Other(format!(
                "attention: causal masking needs q_len == kv_len, got {} and {}",
                shape.q_len, shape.kv_len
            )));
        }
        Ok(attention::scaled_dot_product(q, k, v, shape, causal))
    }
}
