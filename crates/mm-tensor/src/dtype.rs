use std::fmt;

/// Element types a tensor can hold.
///
/// Activations and weights are `F32`; token batches are `U32` so that a
/// float tensor handed to a token-consuming API is rejected instead of being
/// silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 32-bit unsigned integer (token IDs).
    U32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::U32 => write!(f, "u32"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DType::F32.to_string(), "f32");
        assert_eq!(DType::U32.to_string(), "u32");
    }
}
