//! Cascade-bounded collector.
//!
//! Every physical free happens inside a *cascade*: a budget of at most
//! `cascade_limit` frees plus a worklist of objects whose count reached 0
//! while the cascade was running a destructor. Both entry points share it:
//!
//! - `deallocate` (and `release` reaching 0) starts a cascade at one object.
//! - A bounded pass walks the object table from the start and frees every
//!   record at 0 it meets, draining the worklist after each free.
//!
//! Releases made by destructors never recurse into another free; they push
//! onto the worklist of the running cascade. When the budget runs out the
//! remaining zero-count objects stay tracked until a later pass.

use std::collections::VecDeque;
use std::ops::AddAssign;
use std::panic::{self, AssertUnwindSafe};

use crate::allocators::scan;
use crate::api::config::UNBOUNDED;
use crate::api::handle::ObjPtr;
use crate::api::heap::RefHeap;
use crate::core::table::{Destructor, TrackedObject};
use crate::diagnostics::{emit_with_context, is_verbose, RM202};

/// What a collection pass or cascade reclaimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Objects physically freed.
    pub objects: usize,
    /// Payload bytes freed.
    pub bytes: usize,
}

impl PassReport {
    /// Whether nothing was freed.
    pub fn is_empty(&self) -> bool {
        self.objects == 0
    }

    fn record(&mut self, size: usize) {
        self.objects += 1;
        self.bytes += size;
    }
}

impl AddAssign for PassReport {
    fn add_assign(&mut self, other: Self) {
        self.objects += other.objects;
        self.bytes += other.bytes;
    }
}

/// State of the running cascade.
#[derive(Debug)]
pub(crate) struct Cascade {
    /// Frees left before the cascade stops
    budget: usize,
    /// Objects whose count reached 0 during this cascade
    pending: VecDeque<ObjPtr>,
    /// Table position of a bounded pass
    cursor: usize,
}

impl Cascade {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            pending: VecDeque::new(),
            cursor: 0,
        }
    }
}

impl RefHeap {
    /// Free every object at reference count 0, with no bound.
    ///
    /// Objects whose count reaches 0 through destructors run during the
    /// call are freed as well.
    pub fn cleanup(&mut self) -> PassReport {
        self.bounded_pass(UNBOUNDED)
    }

    /// Run one bounded pass with the current cascade limit.
    pub fn collect(&mut self) -> PassReport {
        self.bounded_pass(self.config.cascade_limit)
    }

    /// Free `obj` if it is tracked at reference count 0.
    ///
    /// Starts a cascade bounded by the cascade limit; objects released to 0
    /// by destructors within it are freed too while budget remains. The
    /// budget is local to this call. Called from a destructor, the object
    /// joins the running cascade instead and an empty report is returned.
    pub fn deallocate(&mut self, obj: ObjPtr) -> PassReport {
        match self.table.get(obj) {
            Some(record) if record.refcount == 0 => {}
            _ => return PassReport::default(),
        }

        if let Some(cascade) = self.cascade.as_mut() {
            cascade.pending.push_back(obj);
            return PassReport::default();
        }

        let mut cascade = Cascade::new(self.config.cascade_limit);
        cascade.pending.push_back(obj);
        self.run_cascade(cascade, |heap, report| heap.drain_pending(report))
    }

    /// Bounded passes before an allocation of `size` bytes.
    ///
    /// Repeats until a pass frees nothing or `size` bytes were reclaimed.
    pub(crate) fn collect_for(&mut self, size: usize) -> PassReport {
        let mut total = PassReport::default();
        loop {
            let pass = self.bounded_pass(self.config.cascade_limit);
            total += pass;
            if pass.is_empty() || total.bytes >= size {
                return total;
            }
        }
    }

    pub(crate) fn bounded_pass(&mut self, limit: usize) -> PassReport {
        // A destructor asked for a pass; the running cascade covers it.
        if self.cascade.is_some() {
            return PassReport::default();
        }

        self.counters.collection_passes += 1;
        let report = self.run_cascade(Cascade::new(limit), |heap, report| heap.sweep(report));

        #[cfg(feature = "log")]
        if !report.is_empty() {
            log::debug!(
                "refmem: pass freed {} objects ({} bytes), {} tracked",
                report.objects,
                report.bytes,
                self.table.len()
            );
        }

        report
    }

    /// Install `cascade`, run `body`, then retire the cascade.
    ///
    /// A panicking destructor unwinds out of `body`; the cascade is dropped
    /// before the panic resumes so the heap keeps reclaiming afterwards.
    fn run_cascade<F>(&mut self, cascade: Cascade, body: F) -> PassReport
    where
        F: FnOnce(&mut RefHeap, &mut PassReport),
    {
        self.cascade = Some(cascade);

        let mut report = PassReport::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(self, &mut report)));
        if let Err(cause) = outcome {
            self.cascade = None;
            panic::resume_unwind(cause);
        }

        self.finish_cascade();
        report
    }

    /// Walk the table from the cursor, freeing records at 0.
    fn sweep(&mut self, report: &mut PassReport) {
        loop {
            self.drain_pending(report);

            let Some(cascade) = self.cascade.as_mut() else {
                return;
            };
            if cascade.budget == 0 {
                return;
            }

            let cursor = cascade.cursor;
            match self.table.at(cursor) {
                None => return,
                Some(record) if record.refcount == 0 => self.free_at(cursor, report),
                Some(_) => cascade.cursor += 1,
            }
        }
    }

    /// Free worklist entries while budget remains.
    fn drain_pending(&mut self, report: &mut PassReport) {
        loop {
            let Some(cascade) = self.cascade.as_mut() else {
                return;
            };
            if cascade.budget == 0 {
                return;
            }
            let Some(obj) = cascade.pending.pop_front() else {
                return;
            };

            // Retained again, or already freed, since it was queued.
            let Some(index) = self.table.index_of(obj) else {
                continue;
            };
            if self.table.at(index).map_or(true, |r| r.refcount != 0) {
                continue;
            }

            self.free_at(index, report);
        }
    }

    fn free_at(&mut self, index: usize, report: &mut PassReport) {
        if let Some(cascade) = self.cascade.as_mut() {
            cascade.budget = cascade.budget.saturating_sub(1);
            if index < cascade.cursor {
                cascade.cursor -= 1;
            }
        }

        let record = self.table.remove(index);
        report.record(record.size);
        self.destroy(record);
    }

    /// Run the destructor of an unlinked record and release its memory.
    fn destroy(&mut self, record: TrackedObject) {
        let TrackedObject {
            payload,
            size,
            destructor,
            ..
        } = record;

        let outcome = match destructor {
            Destructor::Conservative => {
                // Unregister first so a self-reference is not matched.
                self.registry.remove(payload.addr());

                // SAFETY: the payload stays allocated until the dealloc
                // below and nothing writes to it while it is scanned.
                let bytes = unsafe { scan::payload_bytes(payload.as_non_null(), size) };
                let found = scan::candidates(bytes, &self.registry);

                self.counters.conservative_scans += 1;
                self.counters.scan_matches += found.len() as u64;

                for obj in found.into_iter().filter_map(ObjPtr::from_addr) {
                    self.release(obj);
                }
                Ok(())
            }
            Destructor::Custom(mut f) => {
                self.counters.custom_destructor_runs += 1;
                panic::catch_unwind(AssertUnwindSafe(|| f(self, payload)))
            }
        };

        #[cfg(feature = "debug")]
        self.traces.record_free(payload.addr());

        // SAFETY: the payload was allocated by `system` with `size` and its
        // record is no longer in the table.
        unsafe {
            self.system.dealloc(payload.as_non_null(), size);
        }
        self.counters.free_count += 1;

        if let Err(cause) = outcome {
            panic::resume_unwind(cause);
        }
    }

    fn finish_cascade(&mut self) {
        let Some(cascade) = self.cascade.take() else {
            return;
        };

        let left = cascade
            .pending
            .iter()
            .filter(|obj| self.table.get(**obj).map_or(false, |r| r.refcount == 0))
            .count();
        if left == 0 {
            return;
        }

        #[cfg(feature = "log")]
        log::debug!("refmem: cascade budget exhausted, {} objects pending", left);

        if is_verbose() {
            emit_with_context(&RM202, &format!("{} objects pending", left));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::api::config::HeapConfig;
    use crate::api::handle::ObjState;
    use crate::core::table::destructor;
    use crate::util::layout::WORD;

    /// A cell whose first word owns another cell.
    fn alloc_cell(heap: &mut RefHeap) -> ObjPtr {
        heap.allocate(
            2 * WORD,
            destructor(|heap, obj| {
                let child = unsafe { *obj.cast::<*mut u8>() };
                if let Some(child) = ObjPtr::from_raw(child) {
                    heap.release(child);
                }
            }),
        )
        .unwrap()
    }

    fn link(parent: ObjPtr, child: ObjPtr) {
        unsafe { *parent.cast::<*mut u8>() = child.as_ptr() };
    }

    /// A retained chain of `len` cells, head first.
    ///
    /// Needs a heap that does not collect on allocate.
    fn chain(heap: &mut RefHeap, len: usize) -> Vec<ObjPtr> {
        let cells: Vec<ObjPtr> = (0..len).map(|_| alloc_cell(heap)).collect();
        for pair in cells.windows(2) {
            link(pair[0], pair[1]);
        }
        for &cell in &cells {
            heap.retain(cell);
        }
        cells
    }

    #[test]
    fn test_release_frees_whole_chain_unbounded() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let cells = chain(&mut heap, 6);

        heap.release(cells[0]);
        assert!(heap.is_empty());
        assert_eq!(heap.stats().custom_destructor_runs, 6);
    }

    #[test]
    fn test_cascade_limit_bounds_release() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let cells = chain(&mut heap, 5);
        heap.set_cascade_limit(1);

        heap.release(cells[0]);
        assert!(!heap.is_tracked(cells[0]));
        assert_eq!(heap.len(), 4);
        assert!(heap.is_tracked(cells[1]));
        assert_eq!(heap.rc(cells[1]), 0);

        for remaining in (0..4).rev() {
            let report = heap.collect();
            assert_eq!(report.objects, 1);
            assert_eq!(heap.len(), remaining);
        }
        assert!(heap.collect().is_empty());
    }

    #[test]
    fn test_unbounded_cleanup_after_limited_release() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let cells = chain(&mut heap, 5);
        heap.set_cascade_limit(1);
        heap.release(cells[0]);
        assert_eq!(heap.len(), 4);

        heap.set_cascade_limit(UNBOUNDED);
        let report = heap.collect();
        assert_eq!(report.objects, 4);
        assert_eq!(report.bytes, 4 * 2 * WORD);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_pass_skips_retained_objects() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let kept = heap.allocate(8, None).unwrap();
        heap.retain(kept);
        let a = heap.allocate(4, None).unwrap();
        let b = heap.allocate(5, None).unwrap();

        let report = heap.cleanup();
        assert_eq!(report, PassReport { objects: 2, bytes: 9 });
        assert!(heap.is_tracked(kept));
        assert!(!heap.is_tracked(a));
        assert!(!heap.is_tracked(b));
    }

    #[test]
    fn test_pass_frees_objects_behind_cursor() {
        let mut heap = RefHeap::new(HeapConfig::manual());

        // Table order: child, retained, parent. Freeing parent releases the
        // child, which sits before the cursor.
        let child = alloc_cell(&mut heap);
        let retained = heap.allocate(8, None).unwrap();
        let parent = alloc_cell(&mut heap);
        link(parent, child);
        heap.retain(child);
        heap.retain(retained);
        heap.retain(child);
        heap.release(child);

        let report = heap.cleanup();
        assert_eq!(report.objects, 2);
        assert!(!heap.is_tracked(parent));
        assert!(!heap.is_tracked(child));
        assert!(heap.is_tracked(retained));
    }

    #[test]
    fn test_zero_limit_disables_reclamation() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let obj = heap.allocate(8, None).unwrap();
        heap.retain(obj);
        heap.set_cascade_limit(0);

        heap.release(obj);
        assert!(heap.is_tracked(obj));
        assert!(heap.collect().is_empty());

        assert_eq!(heap.cleanup().objects, 1);
    }

    #[test]
    fn test_deallocate_requires_zero_count() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let obj = heap.allocate(8, None).unwrap();
        heap.retain(obj);

        assert!(heap.deallocate(obj).is_empty());
        assert!(heap.is_tracked(obj));

        heap.release(obj);
        assert!(!heap.is_tracked(obj));
        assert!(heap.deallocate(obj).is_empty());
    }

    #[test]
    fn test_allocate_collects_until_size_reclaimed() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        for size in [8, 16, 24] {
            heap.allocate(size, None).unwrap();
        }
        assert_eq!(heap.len(), 3);
        heap.config = HeapConfig::incremental(1);

        // Needs 20 bytes: the 8- and 16-byte objects go, the 24-byte one stays.
        let obj = heap.allocate(20, None).unwrap();
        assert_eq!(heap.len(), 2);
        assert!(heap.is_tracked(obj));
        assert_eq!(heap.tracked_bytes(), 44);
    }

    #[test]
    fn test_destructor_runs_once_when_retained_again() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let obj = heap
            .allocate(
                8,
                destructor(move |_, _| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .unwrap();
        heap.retain(obj);
        heap.release(obj);
        heap.release(obj);
        heap.cleanup();
        heap.cleanup();

        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_destructor_may_allocate() {
        let mut heap = RefHeap::with_defaults();
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();

        let obj = heap
            .allocate(
                8,
                destructor(move |heap, _| {
                    let replacement = heap.allocate(8, None).unwrap();
                    heap.retain(replacement);
                    counter.store(replacement.addr(), Ordering::Relaxed);
                }),
            )
            .unwrap();
        heap.retain(obj);
        heap.release(obj);

        let replacement = ObjPtr::from_addr(created.load(Ordering::Relaxed)).unwrap();
        assert_eq!(heap.rc(replacement), 1);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_heap_usable_after_destructor_panic() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        let bad = heap
            .allocate(16, destructor(|_, _| panic!("destructor failed")))
            .unwrap();
        heap.retain(bad);

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| heap.release(bad)));
        assert!(result.is_err());
        assert!(heap.cascade.is_none());
        assert_eq!(heap.state(bad), ObjState::Untracked);
        assert_eq!(heap.tracked_bytes(), 0);

        let obj = heap.allocate(8, None).unwrap();
        heap.retain(obj);
        heap.release(obj);
        assert_eq!(heap.state(obj), ObjState::Untracked);

        heap.allocate(8, None).unwrap();
        assert_eq!(heap.cleanup().objects, 1);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_pass_usable_after_destructor_panic() {
        let mut heap = RefHeap::new(HeapConfig::manual());
        heap.allocate(8, destructor(|_, _| panic!("destructor failed")))
            .unwrap();
        heap.allocate(8, None).unwrap();

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| heap.cleanup()));
        assert!(result.is_err());
        assert_eq!(heap.len(), 1);

        assert_eq!(heap.cleanup().objects, 1);
        assert!(heap.is_empty());
    }
}
