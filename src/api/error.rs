//! Allocation errors.

use crate::diagnostics::{Diagnostic, RM001, RM002, RM003};

/// Errors returned by `allocate` and `allocate_array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The system allocator could not provide `size` bytes.
    OutOfMemory {
        /// Requested payload size
        size: usize,
    },
    /// `count * elem_size` does not fit in `usize`.
    SizeOverflow {
        /// Requested element count
        count: usize,
        /// Requested element size
        elem_size: usize,
    },
    /// `size` exceeds the largest layout the platform can describe.
    InvalidLayout {
        /// Requested payload size
        size: usize,
    },
}

impl AllocError {
    /// The diagnostic reported for this error.
    pub fn diagnostic(&self) -> &'static Diagnostic {
        match self {
            AllocError::OutOfMemory { .. } => &RM001,
            AllocError::SizeOverflow { .. } => &RM002,
            AllocError::InvalidLayout { .. } => &RM003,
        }
    }
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocError::OutOfMemory { size } => {
                write!(f, "out of memory allocating {} bytes", size)
            }
            AllocError::SizeOverflow { count, elem_size } => {
                write!(f, "array of {} x {} bytes overflows usize", count, elem_size)
            }
            AllocError::InvalidLayout { size } => {
                write!(f, "{} bytes exceeds the maximum payload size", size)
            }
        }
    }
}

impl std::error::Error for AllocError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AllocError::SizeOverflow { count: 3, elem_size: 4 };
        assert_eq!(err.to_string(), "array of 3 x 4 bytes overflows usize");
        assert_eq!(err.diagnostic().code, "RM002");

        let err = AllocError::OutOfMemory { size: 10 };
        assert_eq!(err.to_string(), "out of memory allocating 10 bytes");
        assert_eq!(err.diagnostic().code, "RM001");
    }
}
