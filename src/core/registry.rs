//! Pointer registry.
//!
//! The set of payload addresses that were allocated without an explicit
//! destructor. It is not an ownership relation: the conservative scan only
//! uses it to decide whether a word it read is a tracked address.

use rustc_hash::FxHashSet;

/// Set of addresses eligible to be matched by a conservative scan.
#[derive(Debug, Default)]
pub struct PointerRegistry {
    addrs: FxHashSet<usize>,
}

impl PointerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address. Returns false if it was already present.
    pub fn insert(&mut self, addr: usize) -> bool {
        self.addrs.insert(addr)
    }

    /// Unregister an address. Returns false if it was not present.
    pub fn remove(&mut self, addr: usize) -> bool {
        self.addrs.remove(&addr)
    }

    /// Whether `addr` is registered.
    pub fn contains(&self, addr: usize) -> bool {
        self.addrs.contains(&addr)
    }

    /// Number of registered addresses.
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Drop every registered address.
    pub fn clear(&mut self) {
        self.addrs.clear();
        self.addrs.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut registry = PointerRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.insert(0x10));
        assert!(!registry.insert(0x10));
        assert!(registry.contains(0x10));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(0x10));
        assert!(!registry.remove(0x10));
        assert!(!registry.contains(0x10));
    }

    #[test]
    fn test_remove_from_empty() {
        let mut registry = PointerRegistry::new();
        assert!(!registry.remove(0xdead));
        registry.clear();
        assert!(registry.is_empty());
    }
}
