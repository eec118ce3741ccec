//! System heap wrapper for tracked payloads.

use std::alloc::{alloc_zeroed, dealloc};
use std::ptr::NonNull;

use crate::api::error::AllocError;
use crate::util::layout::payload_layout;

/// Wrapper around the system allocator for payload memory.
///
/// Every payload is zero-initialised and aligned to pointer width.
pub struct SystemHeap {
    /// Total bytes currently allocated (as requested, not rounded)
    allocated_bytes: usize,

    /// Total allocation count
    allocation_count: u64,
}

impl SystemHeap {
    /// Create a new system heap wrapper.
    pub fn new() -> Self {
        Self {
            allocated_bytes: 0,
            allocation_count: 0,
        }
    }

    /// Reserve `size` zeroed bytes.
    pub fn alloc_zeroed(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = payload_layout(size).ok_or(AllocError::InvalidLayout { size })?;

        // SAFETY: payload_layout never returns a zero-sized layout
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(AllocError::OutOfMemory { size })?;

        self.allocated_bytes += size;
        self.allocation_count += 1;
        Ok(ptr)
    }

    /// Release a payload.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `alloc_zeroed(size)` on this heap and
    /// not released since.
    pub unsafe fn dealloc(&mut self, ptr: NonNull<u8>, size: usize) {
        // payload_layout(size) succeeded when the payload was allocated
        if let Some(layout) = payload_layout(size) {
            #[cfg(feature = "debug")]
            {
                crate::debug::poison::poison_freed(ptr.as_ptr(), layout.size());
            }

            dealloc(ptr.as_ptr(), layout);
            self.allocated_bytes -= size;
        }
    }

    /// Get total bytes currently allocated.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Get total allocation count.
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count
    }
}

impl Default for SystemHeap {
    fn default() -> Self {
        Self::new()
    }
}
