use mm_tensor::ComputeBackend;

use crate::config::NormKind;
use crate::error::Result;

/// LayerNorm or RMSNorm over the last dimension, initialised to identity
/// scale and zero shift.
pub struct Norm {
    kind: NormKind,
    weight: Vec<f32>,
    bias: Vec<f32>,
    eps: f32,
}

impl Norm {
    pub fn new(kind: NormKind, dim: usize, eps: f32) -> Self {
        Self {
            kind,
            weight: vec![1.0; dim],
            bias: vec![0.0; dim],
            eps,
        }
    }

    pub fn layer(dim: usize, eps: f32) -> Self {
        Self::new(NormKind::LayerNorm, dim, eps)
    }

    pub fn forward(&self, x: &[f32], backend: &dyn ComputeBackend) -> Result<Vec<f32>> {
        let dim = self.weight.len();
        let y = match self.kind {
            NormKind::LayerNorm => backend.layer_norm(x, &self.weight, &self.bias, self.eps, dim)?,
            NormKind::RmsNorm => backend.rms_norm(x, &self.weight, self.eps, dim)?,
        };
        Ok(y)
    }
}
