//! Thread-local default heap.
//!
//! Free functions over one [`RefHeap`] per thread, taking and returning
//! raw payload pointers. Null and untracked pointers are accepted
//! everywhere and ignored; failed allocations return null.
//!
//! ```rust
//! use refmem::global;
//!
//! let p = global::allocate(16, None);
//! assert!(!p.is_null());
//! global::retain(p);
//! assert_eq!(global::rc(p), 1);
//! global::release(p);
//! assert_eq!(global::rc(p), 0);
//! global::shutdown();
//! ```
//!
//! # Re-entrancy
//!
//! The thread's heap is borrowed for the duration of each call, including
//! the destructors it runs. A destructor must use the `&mut RefHeap` it is
//! given; calling back into this module from a destructor panics.

use std::cell::RefCell;

use crate::api::handle::ObjPtr;
use crate::api::heap::RefHeap;
use crate::api::stats::HeapStats;
use crate::core::table::DestructorFn;

thread_local! {
    static HEAP: RefCell<RefHeap> = RefCell::new(RefHeap::with_defaults());
}

/// Run `f` with this thread's heap.
pub fn with_heap<F, R>(f: F) -> R
where
    F: FnOnce(&mut RefHeap) -> R,
{
    HEAP.with(|cell| f(&mut *cell.borrow_mut()))
}

/// Allocate `size` zeroed bytes with a reference count of 0.
///
/// Returns null if the allocation fails.
pub fn allocate(size: usize, destructor: Option<DestructorFn>) -> *mut u8 {
    with_heap(|heap| heap.allocate(size, destructor))
        .map_or(std::ptr::null_mut(), ObjPtr::as_ptr)
}

/// Allocate `count * elem_size` zeroed bytes.
///
/// Returns null if the size overflows or the allocation fails.
pub fn allocate_array(count: usize, elem_size: usize, destructor: Option<DestructorFn>) -> *mut u8 {
    with_heap(|heap| heap.allocate_array(count, elem_size, destructor))
        .map_or(std::ptr::null_mut(), ObjPtr::as_ptr)
}

/// Increment the reference count of `p`.
pub fn retain(p: *mut u8) {
    if let Some(obj) = ObjPtr::from_raw(p) {
        with_heap(|heap| heap.retain(obj));
    }
}

/// Decrement the reference count of `p`, freeing it on reaching 0.
pub fn release(p: *mut u8) {
    if let Some(obj) = ObjPtr::from_raw(p) {
        with_heap(|heap| heap.release(obj));
    }
}

/// Reference count of `p`; 0 for null or untracked pointers.
pub fn rc(p: *mut u8) -> usize {
    ObjPtr::from_raw(p).map_or(0, |obj| with_heap(|heap| heap.rc(obj)))
}

/// Free `p` if it is tracked at reference count 0.
pub fn deallocate(p: *mut u8) {
    if let Some(obj) = ObjPtr::from_raw(p) {
        with_heap(|heap| heap.deallocate(obj));
    }
}

/// Free every object at reference count 0.
pub fn cleanup() {
    with_heap(|heap| heap.cleanup());
}

/// Free every object without running destructors.
///
/// The heap stays usable afterwards.
pub fn shutdown() {
    with_heap(|heap| heap.shutdown());
}

/// Set the cascade limit of this thread's heap.
pub fn set_cascade_limit(limit: usize) {
    with_heap(|heap| heap.set_cascade_limit(limit));
}

/// Cascade limit of this thread's heap.
pub fn get_cascade_limit() -> usize {
    with_heap(|heap| heap.cascade_limit())
}

/// Statistics of this thread's heap.
pub fn stats() -> HeapStats {
    with_heap(|heap| heap.stats())
}
