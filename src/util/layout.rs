//! Layout utilities.

use std::alloc::Layout;

/// Width of a machine pointer, the stride of the conservative scan.
pub const WORD: usize = std::mem::size_of::<usize>();

/// Layout used for every tracked payload.
///
/// Payloads are aligned to pointer width so that embedded addresses sit on
/// scan strides. A zero-byte request still reserves one byte, which keeps
/// every payload address unique while the object is tracked.
pub fn payload_layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size.max(1), WORD).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_layout() {
        let layout = payload_layout(0).unwrap();
        assert_eq!(layout.size(), 1);
        assert_eq!(layout.align(), WORD);

        let layout = payload_layout(24).unwrap();
        assert_eq!(layout.size(), 24);

        assert!(payload_layout(usize::MAX).is_none());
    }
}
