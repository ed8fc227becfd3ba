use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::CpuStorage;

/// A tensor backed by CPU storage.
///
/// Holds contiguous, row-major data with an associated shape. The dtype is
/// that of the storage. Computation happens on raw slices through a
/// `ComputeBackend`; the tensor only carries data and shape between stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: CpuStorage,
    shape: Shape,
}

impl Tensor {
    fn from_storage(storage: CpuStorage, shape: Shape) -> Result<Self> {
        if storage.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![storage.len()],
            });
        }
        Ok(Tensor { storage, shape })
    }

    /// Create an f32 tensor from data and a shape.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `data.len() != shape.numel()`.
    pub fn from_f32(data: Vec<f32>, shape: impl Into<Shape>) -> Result<Self> {
        Self::from_storage(CpuStorage::from_f32_vec(data), shape.into())
    }

    /// Create a u32 tensor (token IDs) from data and a shape.
    pub fn from_u32(data: Vec<u32>, shape: impl Into<Shape>) -> Result<Self> {
        Self::from_storage(CpuStorage::from_u32_vec(data), shape.into())
    }

    /// Create a zero-filled f32 tensor with the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        Tensor {
            storage: CpuStorage::zeros(DType::F32, shape.numel()),
            shape,
        }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Returns the underlying data as an f32 slice.
    pub fn as_f32(&self) -> Result<&[f32]> {
        self.storage.as_f32_slice()
    }

    /// Returns the underlying data as a u32 slice.
    pub fn as_u32(&self) -> Result<&[u32]> {
        self.storage.as_u32_slice()
    }
}
