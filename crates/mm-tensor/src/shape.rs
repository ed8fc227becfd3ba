use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a shape from a slice of dimensions.
    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    fn expect_rank(&self, rank: usize) -> Result<()> {
        if self.dims.len() != rank {
            return Err(TensorError::RankMismatch {
                expected: rank,
                got: self.dims.clone(),
            });
        }
        Ok(())
    }

    pub fn dims2(&self) -> Result<(usize, usize)> {
        self.expect_rank(2)?;
        Ok((self.dims[0], self.dims[1]))
    }

    pub fn dims3(&self) -> Result<(usize, usize, usize)> {
        self.expect_rank(3)?;
        Ok((self.dims[0], self.dims[1], self.dims[2]))
    }

    pub fn dims4(&self) -> Result<(usize, usize, usize, usize)> {
        self.expect_rank(4)?;
        Ok((self.dims[0], self.dims[1], self.dims[2], self.dims[3]))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::from_slice(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.numel(), 24);
        assert_eq!(s.dims(), &[2, 3, 4]);
        assert_eq!(s.to_string(), "[2, 3, 4]");
    }

    #[test]
    fn test_scalar_shape() {
        let s = Shape::new(vec![]);
        assert_eq!(s.numel(), 1); // product of empty = 1
    }

    #[test]
    fn test_zero_dim() {
        let s = Shape::from([1, 3, 0, 0]);
        assert_eq!(s.numel(), 0);
    }

    #[test]
    fn test_dims_accessors() {
        let s = Shape::from([1, 3, 8, 8]);
        assert_eq!(s.dims4().unwrap(), (1, 3, 8, 8));
        match s.dims3() {
            Err(TensorError::RankMismatch { expected, got }) => {
                assert_eq!(expected, 3);
                assert_eq!(got, vec![1, 3, 8, 8]);
            }
            other => panic!("expected rank mismatch, got {:?}", other),
        }
        assert_eq!(Shape::from([2, 5]).dims2().unwrap(), (2, 5));
    }
}
