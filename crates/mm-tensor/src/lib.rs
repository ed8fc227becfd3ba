//! `mm-tensor` - Tensor library with pluggable compute backends for multimodal-runtime.
//!
//! This crate provides:
//! - A `Tensor` type backed by CPU storage (f32 activations, u32 token IDs)
//! - A `ComputeBackend` trait for pluggable compute
//! - A reference `CpuBackend` implementation parallelised with rayon
//! - Shape utilities and seeded random constructors

pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod random;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::{AttentionShape, ComputeBackend};
pub use cpu::CpuBackend;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use storage::CpuStorage;
pub use tensor::Tensor;
