use mm_tensor::ComputeBackend;

use super::{Linear, ParamInit};
use crate::config::FeedForwardKind;
use crate::error::Result;

/// Position-wise feed-forward sub-layer.
pub enum FeedForward {
    Gelu {
        proj_in: Linear,
        proj_out: Linear,
    },
    SwiGlu {
        gate: Linear,
        up: Linear,
        down: Linear,
    },
}

impl FeedForward {
    pub fn new(
        kind: FeedForwardKind,
        dim: usize,
        mult: usize,
        init: &mut ParamInit,
    ) -> Result<Self> {
        let inner = dim * mult;
        Ok(match kind {
            FeedForwardKind::Gelu => FeedForward::Gelu {
                proj_in: Linear::new(dim, inner, true, init)?,
                proj_out: Linear::new(inner, dim, true, init)?,
            },
            FeedForwardKind::SwiGlu => FeedForward::SwiGlu {
                gate: Linear::new(dim, inner, false, init)?,
                up: Linear::new(dim, inner, false, init)?,
                down: Linear::new(inner, dim, false, init)?,
            },
        })
    }

    pub fn forward(&self, x: &[f32], backend: &dyn ComputeBackend) -> Result<Vec<f32>> {
        match self {
            FeedForward::Gelu { proj_in, proj_out } => {
                let hidden = backend.gelu(&proj_in.forward(x, backend)?)?;
                proj_out.forward(&hidden, backend)
            }
            FeedForward::SwiGlu { gate, up, down } => {
                let gate_activated = backend.silu(&gate.forward(x, backend)?)?;
                let gate_up = backend.mul(&gate_activated, &up.forward(x, backend)?)?;
                down.forward(&gate_up, backend)
            }
        }
    }
}
