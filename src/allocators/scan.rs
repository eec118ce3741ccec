//! Conservative pointer scan.
//!
//! Reads a payload as a run of pointer-width words and reports every word
//! whose value is a registered payload address. There is no type
//! information: any bit pattern equal to a live address is reported, so a
//! false positive leads to a spurious release. Objects that need precise
//! ownership must be allocated with an explicit destructor instead.

use std::ptr::NonNull;

use crate::core::registry::PointerRegistry;
use crate::util::layout::WORD;

/// Collect the registered addresses embedded in `bytes`.
///
/// Strides start at offset 0 and advance by pointer width; a trailing
/// partial word is ignored. A value found at several strides is reported
/// once per stride.
pub fn candidates(bytes: &[u8], registry: &PointerRegistry) -> Vec<usize> {
    if registry.is_empty() {
        return Vec::new();
    }

    bytes
        .chunks_exact(WORD)
        .filter_map(|chunk| {
            let mut word = [0u8; WORD];
            word.copy_from_slice(chunk);
            let candidate = usize::from_ne_bytes(word);
            registry.contains(candidate).then_some(candidate)
        })
        .collect()
}

/// View a payload as bytes for scanning.
///
/// # Safety
///
/// `ptr` must point to a live allocation of at least `size` initialised
/// bytes that is not written to while the returned slice is alive.
pub unsafe fn payload_bytes<'a>(ptr: NonNull<u8>, size: usize) -> &'a [u8] {
    std::slice::from_raw_parts(ptr.as_ptr(), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[usize]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn test_finds_registered_words() {
        let mut registry = PointerRegistry::new();
        registry.insert(0x1000);
        registry.insert(0x2000);

        let bytes = words(&[7, 0x2000, 0, 0x1000, 0x3000]);
        assert_eq!(candidates(&bytes, &registry), vec![0x2000, 0x1000]);
    }

    #[test]
    fn test_duplicate_words_reported_per_stride() {
        let mut registry = PointerRegistry::new();
        registry.insert(0x4000);

        let bytes = words(&[0x4000, 0x4000]);
        assert_eq!(candidates(&bytes, &registry), vec![0x4000, 0x4000]);
    }

    #[test]
    fn test_trailing_partial_word_ignored() {
        let mut registry = PointerRegistry::new();
        registry.insert(0x5000);

        let mut bytes = words(&[1]);
        bytes.extend_from_slice(&0x5000usize.to_ne_bytes()[..WORD - 1]);
        assert!(candidates(&bytes, &registry).is_empty());
    }

    #[test]
    fn test_unaligned_values_not_matched() {
        let mut registry = PointerRegistry::new();
        registry.insert(0x6000);

        // The address straddles two strides.
        let mut bytes = vec![0u8; 1];
        bytes.extend_from_slice(&0x6000usize.to_ne_bytes());
        bytes.resize(2 * WORD, 0);
        assert!(candidates(&bytes, &registry).is_empty());
    }

    #[test]
    fn test_empty_registry_short_circuits() {
        let registry = PointerRegistry::new();
        let bytes = words(&[0x1000, 0x2000]);
        assert!(candidates(&bytes, &registry).is_empty());
    }
}
