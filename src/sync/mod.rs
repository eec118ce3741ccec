//! Synchronization primitives for the shared heap.
//!
//! The core `RefHeap` is single-threaded; these are only used by
//! `SharedHeap` and its deferred-release queue.

pub(crate) mod atomics;
pub(crate) mod mutex;
