//! A heap shared between threads.

use std::sync::Arc;

use crate::allocators::deferred::DeferredReleaseQueue;
use crate::api::config::HeapConfig;
use crate::api::error::AllocError;
use crate::api::handle::{ObjPtr, ObjState};
use crate::api::heap::RefHeap;
use crate::api::stats::HeapStats;
use crate::core::collector::PassReport;
use crate::core::table::DestructorFn;
use crate::sync::mutex::Mutex;

struct Inner {
    heap: Mutex<RefHeap>,
    deferred: DeferredReleaseQueue,
}

/// A [`RefHeap`] behind a mutex, cheap to clone.
///
/// Every operation locks the heap. Threads that must not block can queue a
/// release with [`release_deferred`](Self::release_deferred); queued
/// releases are applied, in order, at the start of the next locked
/// operation from any thread.
///
/// # Example
///
/// ```rust
/// use refmem::SharedHeap;
///
/// let heap = SharedHeap::with_defaults();
/// let obj = heap.allocate(32, None).unwrap();
/// heap.retain(obj);
///
/// let remote = heap.clone();
/// std::thread::spawn(move || remote.release_deferred(obj))
///     .join()
///     .unwrap();
///
/// assert_eq!(heap.pending_releases(), 1);
/// assert_eq!(heap.rc(obj), 0);
/// ```
#[derive(Clone)]
pub struct SharedHeap {
    inner: Arc<Inner>,
}

impl SharedHeap {
    /// Create a shared heap with the given configuration.
    pub fn new(config: HeapConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                heap: Mutex::new(RefHeap::new(config)),
                deferred: DeferredReleaseQueue::new(),
            }),
        }
    }

    /// Create a shared heap with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(HeapConfig::default())
    }

    /// Lock the heap, apply queued releases, then run `f`.
    ///
    /// Destructors run while the lock is held; they must use the heap they
    /// are given, not this handle.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut RefHeap) -> R,
    {
        let mut heap = self.inner.heap.lock();
        self.inner.deferred.drain(|obj| heap.release(obj));
        f(&mut *heap)
    }

    /// See [`RefHeap::allocate`].
    pub fn allocate(
        &self,
        size: usize,
        destructor: Option<DestructorFn>,
    ) -> Result<ObjPtr, AllocError> {
        self.with(|heap| heap.allocate(size, destructor))
    }

    /// See [`RefHeap::allocate_array`].
    pub fn allocate_array(
        &self,
        count: usize,
        elem_size: usize,
        destructor: Option<DestructorFn>,
    ) -> Result<ObjPtr, AllocError> {
        self.with(|heap| heap.allocate_array(count, elem_size, destructor))
    }

    /// See [`RefHeap::retain`].
    pub fn retain(&self, obj: ObjPtr) {
        self.with(|heap| heap.retain(obj));
    }

    /// See [`RefHeap::release`].
    pub fn release(&self, obj: ObjPtr) {
        self.with(|heap| heap.release(obj));
    }

    /// Queue a release without taking the lock.
    pub fn release_deferred(&self, obj: ObjPtr) {
        self.inner.deferred.push(obj);
    }

    /// Releases queued but not yet applied.
    pub fn pending_releases(&self) -> usize {
        self.inner.deferred.len()
    }

    /// See [`RefHeap::rc`].
    pub fn rc(&self, obj: ObjPtr) -> usize {
        self.with(|heap| heap.rc(obj))
    }

    /// See [`RefHeap::state`].
    pub fn state(&self, obj: ObjPtr) -> ObjState {
        self.with(|heap| heap.state(obj))
    }

    /// See [`RefHeap::deallocate`].
    pub fn deallocate(&self, obj: ObjPtr) -> PassReport {
        self.with(|heap| heap.deallocate(obj))
    }

    /// See [`RefHeap::cleanup`].
    pub fn cleanup(&self) -> PassReport {
        self.with(|heap| heap.cleanup())
    }

    /// See [`RefHeap::collect`].
    pub fn collect(&self) -> PassReport {
        self.with(|heap| heap.collect())
    }

    /// See [`RefHeap::shutdown`].
    pub fn shutdown(&self) -> usize {
        self.with(|heap| heap.shutdown())
    }

    /// See [`RefHeap::set_cascade_limit`].
    pub fn set_cascade_limit(&self, limit: usize) {
        self.with(|heap| heap.set_cascade_limit(limit));
    }

    /// See [`RefHeap::cascade_limit`].
    pub fn cascade_limit(&self) -> usize {
        self.with(|heap| heap.cascade_limit())
    }

    /// Statistics, after applying queued releases.
    pub fn stats(&self) -> HeapStats {
        self.with(|heap| heap.stats())
    }
}

impl Default for SharedHeap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SharedHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHeap")
            .field("pending_releases", &self.pending_releases())
            .field("deferred_total", &self.inner.deferred.total_pushed())
            .finish()
    }
}
