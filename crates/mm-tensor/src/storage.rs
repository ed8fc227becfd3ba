use crate::dtype::DType;
use crate::error::{Result, TensorError};

/// CPU-side tensor storage: one contiguous, row-major buffer per dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuStorage {
    /// 32-bit floating point storage.
    F32(Vec<f32>),
    /// 32-bit unsigned integer storage, used for token IDs.
    U32(Vec<u32>),
}

impl CpuStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
            CpuStorage::U32(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the data as an f32 slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if the storage is not F32.
    pub fn as_f32_slice(&self) -> Result<&[f32]> {
        match self {
            CpuStorage::F32(v) => Ok(v.as_slice()),
            other => Err(mismatch(DType::F32, other.dtype())),
        }
    }

    /// Returns the data as a u32 slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if the storage is not U32.
    pub fn as_u32_slice(&self) -> Result<&[u32]> {
        match self {
            CpuStorage::U32(v) => Ok(v.as_slice()),
            other => Err(mismatch(DType::U32, other.dtype())),
        }
    }

    /// Create zero-filled storage for the given dtype and element count.
    pub fn zeros(dtype: DType, n: usize) -> Self {
        match dtype {
            DType::F32 => CpuStorage::F32(vec![0.0; n]),
            DType::U32 => CpuStorage::U32(vec![0; n]),
        }
    }

    pub fn from_f32_vec(data: Vec<f32>) -> Self {
        CpuStorage::F32(data)
    }

    pub fn from_u32_vec(data: Vec<u32>) -> Self {
        CpuStorage::U32(data)
    }

    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
            CpuStorage::U32(_) => DType::U32,
        }
    }
}

fn mismatch(expected: DType, got: DType) -> TensorError {
    TensorError::DTypeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f32_vec() {
        let s = CpuStorage::from_f32_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
        assert_eq!(s.as_f32_slice().unwrap(), &[1.0, 2.0, 3.0]);
        assert!(s.as_u32_slice().is_err());
    }

    #[test]
    fn test_from_u32_vec() {
        let s = CpuStorage::from_u32_vec(vec![7, 8]);
        assert_eq!(s.dtype(), DType::U32);
        assert_eq!(s.as_u32_slice().unwrap(), &[7, 8]);
        match s.as_f32_slice() {
            Err(TensorError::DTypeMismatch { expected, got }) => {
                assert_eq!(expected, "f32");
                assert_eq!(got, "u32");
            }
            other => panic!("expected dtype mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_zeros() {
        let s = CpuStorage::zeros(DType::F32, 5);
        assert_eq!(s.as_f32_slice().unwrap(), &[0.0; 5]);
        let t = CpuStorage::zeros(DType::U32, 2);
        assert_eq!(t.as_u32_slice().unwrap(), &[0, 0]);
    }
}
