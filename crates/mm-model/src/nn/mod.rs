//! Transformer building blocks written against `ComputeBackend`.
//!
//! Activations travel as flat row-major `Vec<f32>` buffers of shape
//! `[rows, width]`; each block knows its own widths and derives the row count.

pub mod attention;
pub mod feed_forward;
pub mod init;
pub mod linear;
pub mod norm;

pub use attention::Attention;
pub use feed_forward::FeedForward;
pub use init::ParamInit;
pub use linear::Linear;
pub use norm::Norm;

use mm_tensor::TensorError;

use crate::error::Result;

/// Number of `width`-sized rows in `x`, or an error if `x` is ragged.
pub(crate) fn row_count(x: &[f32], width: usize, op: &str) -> Result<usize> {
    if width == 0 || x.len() % width != 0 {
        return Err(TensorError::Other(format!(
            "{op}: buffer of {} values is not a whole number of {width}-wide rows",
            x.len()
        ))
        .into());
    }
    Ok(x.len() / width)
}
