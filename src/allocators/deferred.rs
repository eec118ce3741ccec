//! Deferred release queue for cross-thread releases.
//!
//! A thread that does not hold the shared heap lock can queue a release
//! here; the queue is drained by whichever thread next locks the heap.

use crossbeam_queue::SegQueue;

use crate::api::handle::ObjPtr;
use crate::sync::atomics::AtomicCounter;

/// Lock-free queue for deferred releases.
pub struct DeferredReleaseQueue {
    queue: SegQueue<ObjPtr>,
    pushed: AtomicCounter,
    drained: AtomicCounter,
}

impl DeferredReleaseQueue {
    /// Create a new deferred release queue.
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            pushed: AtomicCounter::new(0),
            drained: AtomicCounter::new(0),
        }
    }

    /// Queue a release of `obj`.
    pub fn push(&self, obj: ObjPtr) {
        self.queue.push(obj);
        self.pushed.increment();
    }

    /// Apply every queued release through `release`.
    ///
    /// Returns the number of releases applied.
    pub fn drain(&self, mut release: impl FnMut(ObjPtr)) -> usize {
        let mut drained = 0;
        while let Some(obj) = self.queue.pop() {
            release(obj);
            drained += 1;
        }
        self.drained.add(drained as u64);
        drained
    }

    /// Check if there are pending releases.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get approximate number of pending releases.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Total releases ever queued.
    pub fn total_pushed(&self) -> u64 {
        self.pushed.get()
    }

    /// Total releases ever applied.
    pub fn total_drained(&self) -> u64 {
        self.drained.get()
    }
}

impl Default for DeferredReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}
