//! Poisoning of freed payloads.
//!
//! A freed payload is overwritten with a fixed byte so that a stale read
//! through a released address shows up as an obviously wrong value instead
//! of plausible old data.

/// Byte written over freed payloads.
pub const FREED_PATTERN: u8 = 0xCD;

/// Overwrite a payload with [`FREED_PATTERN`].
///
/// # Safety
///
/// `ptr` must be valid for writes of `size` bytes.
pub unsafe fn poison_freed(ptr: *mut u8, size: usize) {
    std::ptr::write_bytes(ptr, FREED_PATTERN, size);
}

/// Whether every byte of `bytes` carries the freed pattern.
pub fn is_freed_poison(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == FREED_PATTERN)
}
