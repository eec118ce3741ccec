//! Payload addresses and reuse-checked handles.

use std::fmt;
use std::ptr::NonNull;

/// Address of a tracked payload.
///
/// Identity is the address alone: once an object is freed its address may
/// be handed out again for an unrelated allocation, and an `ObjPtr` kept
/// from before cannot tell the two apart. Use [`ObjHandle`] when that
/// matters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjPtr(NonNull<u8>);

impl ObjPtr {
    /// Wrap a raw payload pointer. Returns `None` for null.
    pub fn from_raw(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub(crate) fn from_non_null(ptr: NonNull<u8>) -> Self {
        Self(ptr)
    }

    /// Reinterpret a scanned word as a payload address.
    pub(crate) fn from_addr(addr: usize) -> Option<Self> {
        Self::from_raw(addr as *mut u8)
    }

    /// The raw payload pointer.
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// The payload pointer cast to `T`.
    ///
    /// Payloads are aligned to pointer width; reading or writing a `T` with
    /// a stricter alignment, or past the allocated size, is undefined.
    pub fn cast<T>(self) -> *mut T {
        self.0.as_ptr() as *mut T
    }

    /// The payload address as an integer.
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    pub(crate) fn as_non_null(self) -> NonNull<u8> {
        self.0
    }
}

impl fmt::Debug for ObjPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjPtr({:#x})", self.addr())
    }
}

impl fmt::Pointer for ObjPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

// SAFETY: an ObjPtr is an address; dereferencing it already requires unsafe
// code that must uphold the heap's aliasing rules.
unsafe impl Send for ObjPtr {}
unsafe impl Sync for ObjPtr {}

/// A payload address paired with the allocation serial it was issued for.
///
/// The serial increases with every allocation on a heap, so a handle taken
/// before its object was freed never validates against a later object that
/// happens to reuse the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjHandle {
    pub(crate) ptr: ObjPtr,
    pub(crate) serial: u64,
}

impl ObjHandle {
    /// The payload address this handle was issued for.
    pub fn ptr(&self) -> ObjPtr {
        self.ptr
    }

    /// The allocation serial (for debugging).
    pub fn raw_serial(&self) -> u64 {
        self.serial
    }
}

/// Lifetime state of an address, distinguishing what `rc` conflates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjState {
    /// Never allocated on this heap, or already freed.
    Untracked,
    /// Tracked with a reference count of zero, waiting for collection.
    Pending,
    /// Tracked with the given nonzero reference count.
    Live(usize),
}

impl ObjState {
    /// Whether the heap still owns a record for the address.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, ObjState::Untracked)
    }

    /// The reference count, `0` for untracked or pending addresses.
    pub fn refcount(&self) -> usize {
        match self {
            ObjState::Live(n) => *n,
            ObjState::Untracked | ObjState::Pending => 0,
        }
    }
}
