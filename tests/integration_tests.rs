//! Integration tests for refmem.

use refmem::diagnostics::{set_thread_sink, CollectingSink};
use refmem::{
    destructor, global, AllocError, HeapConfig, ObjPtr, ObjState, RefHeap, SharedHeap, UNBOUNDED,
};
use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const WORD: usize = size_of::<usize>();

/// Store `child`'s address in the first word of `parent`.
fn link(parent: ObjPtr, child: ObjPtr) {
    unsafe { *parent.cast::<usize>() = child.addr() };
}

/// Destructor that releases the object stored in the first word.
fn release_first_word() -> Option<refmem::DestructorFn> {
    destructor(|heap, obj| {
        let child = unsafe { *obj.cast::<*mut u8>() };
        if let Some(child) = ObjPtr::from_raw(child) {
            heap.release(child);
        }
    })
}

#[test]
fn test_retain_is_monotonic() {
    let mut heap = RefHeap::with_defaults();
    let obj = heap.allocate(24, None).unwrap();

    for n in [1usize, 7, 100] {
        let before = heap.rc(obj);
        for _ in 0..n {
            heap.retain(obj);
        }
        assert_eq!(heap.rc(obj), before + n);
    }
}

#[test]
fn test_release_never_goes_below_zero() {
    let mut heap = RefHeap::new(HeapConfig::manual());
    let obj = heap.allocate(8, None).unwrap();

    heap.release(obj);
    heap.release(obj);
    assert_eq!(heap.rc(obj), 0);
    assert_eq!(heap.state(obj), ObjState::Pending);
}

#[test]
fn test_last_release_reclaims() {
    let mut heap = RefHeap::with_defaults();
    let obj = heap.allocate(8, None).unwrap();
    heap.retain(obj);
    heap.retain(obj);

    heap.release(obj);
    assert!(heap.get(obj).is_some());

    heap.release(obj);
    assert!(heap.get(obj).is_none());
    assert_eq!(heap.rc(obj), 0);
    assert_eq!(heap.state(obj), ObjState::Untracked);
}

#[test]
fn test_cascade_limit_spreads_chain_over_passes() {
    let mut heap = RefHeap::new(HeapConfig::manual());
    let cells: Vec<ObjPtr> = (0..5)
        .map(|_| heap.allocate(WORD, release_first_word()).unwrap())
        .collect();
    for pair in cells.windows(2) {
        link(pair[0], pair[1]);
    }
    for &cell in &cells {
        heap.retain(cell);
    }

    heap.set_cascade_limit(1);
    heap.release(cells[0]);
    assert_eq!(heap.len(), 4);

    let report = heap.collect();
    assert_eq!(report.objects, 1);
    assert_eq!(heap.len(), 3);

    heap.set_cascade_limit(UNBOUNDED);
    let report = heap.collect();
    assert_eq!(report.objects, 3);
    assert!(heap.is_empty());
}

#[test]
fn test_cleanup_ignores_cascade_limit() {
    let mut heap = RefHeap::new(HeapConfig::manual().with_cascade_limit(2));
    for _ in 0..10 {
        heap.allocate(16, None).unwrap();
    }

    assert_eq!(heap.collect().objects, 2);
    assert_eq!(heap.cleanup().objects, 8);
}

#[test]
fn test_array_overflow_rejected() {
    let mut heap = RefHeap::with_defaults();

    let err = heap.allocate_array(usize::MAX, usize::MAX, None).unwrap_err();
    assert_eq!(
        err,
        AllocError::SizeOverflow {
            count: usize::MAX,
            elem_size: usize::MAX
        }
    );
    assert!(heap.is_empty());

    let empty = heap.allocate_array(0, usize::MAX / 2, None).unwrap();
    assert_eq!(heap.get(empty).unwrap().size(), 0);

    let ints = heap.allocate_array(4, size_of::<u32>(), None).unwrap();
    assert_eq!(heap.get(ints).unwrap().size(), 16);
}

#[test]
fn test_conservative_scan_releases_stored_address() {
    let mut heap = RefHeap::new(HeapConfig::manual());
    let a = heap.allocate(WORD, None).unwrap();
    let b = heap.allocate(WORD, None).unwrap();
    link(a, b);

    heap.retain(a);
    heap.retain(b);
    heap.retain(b);
    assert_eq!(heap.rc(b), 2);

    heap.release(a);
    assert!(!heap.is_tracked(a));
    assert_eq!(heap.rc(b), 1);
    assert_eq!(heap.stats().scan_matches, 1);
}

#[test]
fn test_conservative_scan_with_collecting_allocate() {
    let mut heap = RefHeap::with_defaults();
    let b = heap.allocate(WORD, None).unwrap();
    heap.retain(b);
    heap.retain(b);
    let a = heap.allocate(WORD, None).unwrap();
    heap.retain(a);
    link(a, b);

    heap.release(a);
    assert!(!heap.is_tracked(a));
    assert_eq!(heap.rc(b), 1);
}

#[test]
fn test_scan_ignores_unregistered_words() {
    let mut heap = RefHeap::new(HeapConfig::manual());
    let custom = heap.allocate(WORD, destructor(|_, _| {})).unwrap();
    let holder = heap.allocate(3 * WORD, None).unwrap();
    heap.retain(custom);
    heap.retain(holder);

    unsafe {
        let words = holder.cast::<usize>();
        *words = custom.addr();
        *words.add(1) = 0xdead_beef;
        *words.add(2) = usize::MAX;
    }

    heap.release(holder);
    assert_eq!(heap.rc(custom), 1);
    assert_eq!(heap.stats().scan_matches, 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut heap = RefHeap::with_defaults();
    assert_eq!(heap.shutdown(), 0);

    let obj = heap.allocate(32, None).unwrap();
    heap.retain(obj);
    heap.allocate(8, release_first_word()).unwrap();

    assert_eq!(heap.shutdown(), 2);
    assert!(heap.is_empty());
    assert_eq!(heap.shutdown(), 0);
    assert!(heap.is_empty());
    assert_eq!(heap.stats().registered_pointers, 0);
}

#[test]
fn test_reverse_release_of_hundred_objects() {
    let mut heap = RefHeap::new(HeapConfig::manual());
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..100).map(|_| AtomicUsize::new(0)).collect());

    let mut objects = Vec::with_capacity(100);
    for i in 0..100 {
        let counter = runs.clone();
        let obj = heap
            .allocate(
                WORD + i,
                destructor(move |heap, obj| {
                    counter[i].fetch_add(1, Ordering::Relaxed);
                    let child = unsafe { *obj.cast::<*mut u8>() };
                    if let Some(child) = ObjPtr::from_raw(child) {
                        heap.release(child);
                    }
                }),
            )
            .unwrap();
        if let Some(&prev) = objects.last() {
            link(obj, prev);
        }
        objects.push(obj);
    }
    for &obj in &objects {
        heap.retain(obj);
    }

    for &obj in objects.iter().rev() {
        heap.release(obj);
    }

    assert_eq!(heap.len(), 0);
    for count in runs.iter() {
        assert!(count.load(Ordering::Relaxed) <= 1);
    }
    assert_eq!(heap.stats().custom_destructor_runs, 100);
}

#[test]
fn test_handle_outlives_object() {
    let mut heap = RefHeap::with_defaults();
    let obj = heap.allocate(64, None).unwrap();
    heap.retain(obj);
    let handle = heap.handle(obj).unwrap();

    heap.release(obj);
    for _ in 0..4 {
        let again = heap.allocate(64, None).unwrap();
        heap.retain(again);
    }
    assert!(!heap.is_live(handle));
    assert_eq!(heap.resolve(handle), None);
}

#[test]
fn test_diagnostics_reach_thread_sink() {
    let sink = Arc::new(CollectingSink::new());
    let previous = set_thread_sink(Some(sink.clone()));

    let mut heap = RefHeap::with_defaults();
    let _ = heap.allocate_array(usize::MAX, 2, None);
    let obj = heap.allocate(8, None).unwrap();
    heap.retain(obj);
    heap.shutdown();

    set_thread_sink(previous);
    assert_eq!(sink.codes(), vec!["RM002", "RM301"]);
}

#[test]
fn test_global_functions_mirror_heap() {
    thread::spawn(|| {
        // Retain right away: allocating collects objects still at 0.
        let child = global::allocate(WORD, None);
        global::retain(child);
        let parent = global::allocate(WORD, None);
        global::retain(parent);
        assert!(!child.is_null() && !parent.is_null());
        unsafe { *(parent as *mut usize) = child as usize };

        assert_eq!(global::rc(child), 1);
        assert_eq!(global::rc(parent), 1);
        assert_eq!(global::stats().tracked_objects, 2);

        global::release(parent);
        assert_eq!(global::rc(child), 0);
        assert_eq!(global::stats().tracked_objects, 0);
        assert_eq!(global::stats().scan_matches, 1);

        assert!(global::allocate_array(usize::MAX, usize::MAX, None).is_null());
        global::shutdown();
    })
    .join()
    .unwrap();
}

#[test]
fn test_shared_heap_deferred_release_from_workers() {
    let heap = SharedHeap::with_defaults();
    let obj = heap.allocate(128, None).unwrap();
    for _ in 0..8 {
        heap.retain(obj);
    }

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let heap = heap.clone();
            thread::spawn(move || heap.release_deferred(obj))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(heap.pending_releases(), 8);
    assert_eq!(heap.state(obj), ObjState::Untracked);
    assert_eq!(heap.pending_releases(), 0);
}
