use mm_tensor::ComputeBackend;

use super::{row_count, ParamInit};
use crate::error::Result;

/// Affine projection `y = x @ W (+ b)`.
///
/// The weight is stored `[in_dim, out_dim]` row-major so a batch of rows is a
/// single backend matmul.
pub struct Linear {
    weight: Vec<f32>,
    bias: Option<Vec<f32>>,
    in_dim: usize,
    out_dim: usize,
}

impl Linear {
    /// Randomly initialised projection; the bias starts at zero.
    pub fn new(in_dim: usize, out_dim: usize, bias: bool, init: &mut ParamInit) -> Result<Self> {
        let weight = init.linear_weight(in_dim, out_dim)?;
        Ok(Self {
            weight,
            bias: bias.then(|| vec![0.0; out_dim]),
            in_dim,
            out_dim,
        })
    }

    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    pub fn forward(&self, x: &[f32], backend: &dyn ComputeBackend) -> Result<Vec<f32>> {
        let rows = row_count(x, self.in_dim, "linear")?;
        let y = backend.matmul(x, &self.weight, rows, self.in_dim, self.out_dim)?;
        match &self.bias {
            Some(bias) => Ok(backend.add_row(&y, bias)?),
            None => Ok(y),
        }
    }
}
