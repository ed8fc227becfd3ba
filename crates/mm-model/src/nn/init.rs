use rand::rngs::StdRng;
use rand::SeedableRng;

use mm_tensor::random::uniform_vec;

use crate::error::Result;

/// Seeded parameter initialiser.
///
/// One generator is threaded through a whole model build so that a given
/// seed always produces the same weights, independent of which component
/// asks first.
pub struct ParamInit {
    rng: StdRng,
}

impl ParamInit {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `n` values from `U[-bound, bound)`.
    pub fn uniform(&mut self, n: usize, bound: f32) -> Result<Vec<f32>> {
        Ok(uniform_vec(n, -bound, bound, &mut self.rng)?)
    }

    /// Linear weight stored `[in_dim, out_dim]`, fan-in scaled.
    pub fn linear_weight(&mut self, in_dim: usize, out_dim: usize) -> Result<Vec<f32>> {
        self.uniform(in_dim * out_dim, 1.0 / (in_dim as f32).sqrt())
    }

    /// Embedding table `[rows, dim]` with small uniform values.
    pub fn embedding(&mut self, rows: usize, dim: usize) -> Result<Vec<f32>> {
        self.uniform(rows * dim, 0.02 * 3.0f32.sqrt())
    }
}

/// FNV-1a hash of a string, used to derive stable seeds from model ids.
pub fn stable_seed(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}
