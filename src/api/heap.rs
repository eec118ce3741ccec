//! The reference-counted heap.

use crate::allocators::heap::SystemHeap;
use crate::api::config::HeapConfig;
use crate::api::error::AllocError;
use crate::api::handle::{ObjHandle, ObjPtr, ObjState};
use crate::api::stats::{HeapCounters, HeapStats};
use crate::core::collector::Cascade;
use crate::core::registry::PointerRegistry;
use crate::core::table::{Destructor, DestructorFn, ObjectTable, TrackedObject};
use crate::diagnostics::{emit, emit_with_context, is_verbose, RM101, RM201, RM301};

#[cfg(feature = "debug")]
use crate::debug::backtrace::BacktraceTracker;

/// A manually managed, reference-counted heap.
///
/// Objects are allocated zeroed with a reference count of 0 and are freed
/// when a [`release`](Self::release) brings the count back to 0, or when a
/// collection pass finds them at 0. Each object is torn down by its custom
/// destructor, or, if it has none, by a conservative scan that releases
/// every registered payload address stored in its bytes.
///
/// The heap is single-threaded (`Send` but not `Sync`). Wrap it in a
/// [`SharedHeap`](crate::SharedHeap) to use it from several threads.
///
/// # Example
///
/// ```rust
/// use refmem::RefHeap;
///
/// let mut heap = RefHeap::with_defaults();
///
/// // Retain right away: allocating collects objects still at 0.
/// let child = heap.allocate(8, None).unwrap();
/// heap.retain(child);
/// let parent = heap.allocate(16, None).unwrap();
/// heap.retain(parent);
///
/// // Store the child's address in the parent.
/// unsafe { *parent.cast::<usize>() = child.addr() };
/// assert_eq!(heap.rc(child), 1);
///
/// // Freeing the parent scans it and releases the child.
/// heap.release(parent);
/// assert!(!heap.is_tracked(child));
/// ```
pub struct RefHeap {
    pub(crate) config: HeapConfig,
    pub(crate) table: ObjectTable,
    pub(crate) registry: PointerRegistry,
    pub(crate) system: SystemHeap,
    pub(crate) cascade: Option<Cascade>,
    pub(crate) counters: HeapCounters,
    next_serial: u64,
    #[cfg(feature = "debug")]
    pub(crate) traces: BacktraceTracker,
}

impl RefHeap {
    /// Create a new heap with the given configuration.
    pub fn new(config: HeapConfig) -> Self {
        if config.cascade_limit == 0 {
            emit(&RM201);
        }

        Self {
            table: ObjectTable::with_capacity(config.initial_capacity),
            registry: PointerRegistry::new(),
            system: SystemHeap::new(),
            cascade: None,
            counters: HeapCounters::default(),
            next_serial: 1,
            #[cfg(feature = "debug")]
            traces: BacktraceTracker::new(),
            config,
        }
    }

    /// Create a heap with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(HeapConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    // ==================== Allocation ====================

    /// Allocate `size` zeroed bytes.
    ///
    /// With no destructor the object is torn down by the conservative scan
    /// and its address becomes matchable by other objects' scans. The new
    /// object starts with a reference count of 0.
    ///
    /// Unless disabled in the config, bounded collection passes run first
    /// until a pass frees nothing or at least `size` bytes were reclaimed.
    pub fn allocate(
        &mut self,
        size: usize,
        destructor: Option<DestructorFn>,
    ) -> Result<ObjPtr, AllocError> {
        if self.config.collect_on_allocate {
            self.collect_for(size);
        }

        let payload = match self.system.alloc_zeroed(size) {
            Ok(ptr) => ObjPtr::from_non_null(ptr),
            Err(err) => {
                emit_with_context(err.diagnostic(), &err.to_string());
                return Err(err);
            }
        };

        let destructor = match destructor {
            Some(f) => Destructor::Custom(f),
            None => {
                self.registry.insert(payload.addr());
                Destructor::Conservative
            }
        };

        let serial = self.next_serial;
        self.next_serial += 1;

        self.table.push(TrackedObject {
            payload,
            refcount: 0,
            size,
            destructor,
            serial,
        });
        self.counters.record_alloc(self.system.allocated_bytes());

        #[cfg(feature = "debug")]
        if self.config.track_backtraces {
            self.traces.record_alloc(payload.addr(), size, serial);
        }

        Ok(payload)
    }

    /// Allocate `count * elem_size` zeroed bytes.
    ///
    /// Fails without allocating when the product would overflow. A
    /// zero-sized element or a zero count never overflows.
    pub fn allocate_array(
        &mut self,
        count: usize,
        elem_size: usize,
        destructor: Option<DestructorFn>,
    ) -> Result<ObjPtr, AllocError> {
        if elem_size != 0 && count >= usize::MAX / elem_size {
            let err = AllocError::SizeOverflow { count, elem_size };
            emit_with_context(err.diagnostic(), &err.to_string());
            return Err(err);
        }

        self.allocate(count * elem_size, destructor)
    }

    // ==================== Lifetime ====================

    /// Increment the reference count. No-op for untracked addresses.
    pub fn retain(&mut self, obj: ObjPtr) {
        match self.table.get_mut(obj) {
            Some(record) => record.refcount = record.refcount.wrapping_add(1),
            None => self.report_untracked("retain", obj),
        }
    }

    /// Decrement the reference count, never below 0.
    ///
    /// When the decrement reaches 0 the object is freed immediately,
    /// together with whatever its destructor releases, up to the cascade
    /// limit. Releasing an object already at 0 does nothing; it stays
    /// tracked until a collection pass. No-op for untracked addresses.
    pub fn release(&mut self, obj: ObjPtr) {
        let reached_zero = match self.table.get_mut(obj) {
            Some(record) if record.refcount > 0 => {
                record.refcount -= 1;
                record.refcount == 0
            }
            Some(_) => false,
            None => {
                self.report_untracked("release", obj);
                false
            }
        };

        if reached_zero {
            self.deallocate(obj);
        }
    }

    /// Reference count of `obj`, or 0 if it is not tracked.
    ///
    /// This cannot tell an untracked address from one pending collection;
    /// use [`state`](Self::state) for that.
    pub fn rc(&self, obj: ObjPtr) -> usize {
        self.table.get(obj).map_or(0, |r| r.refcount)
    }

    /// Lifetime state of `obj`.
    pub fn state(&self, obj: ObjPtr) -> ObjState {
        match self.table.get(obj) {
            None => ObjState::Untracked,
            Some(r) if r.refcount == 0 => ObjState::Pending,
            Some(r) => ObjState::Live(r.refcount),
        }
    }

    // ==================== Lookup ====================

    /// Record for `obj`, if tracked.
    pub fn get(&self, obj: ObjPtr) -> Option<&TrackedObject> {
        self.table.get(obj)
    }

    /// Position of `obj` in the object table, if tracked.
    pub fn index_of(&self, obj: ObjPtr) -> Option<usize> {
        self.table.index_of(obj)
    }

    /// Whether the heap tracks `obj`.
    pub fn is_tracked(&self, obj: ObjPtr) -> bool {
        self.table.get(obj).is_some()
    }

    /// Reuse-checked handle for a tracked object.
    pub fn handle(&self, obj: ObjPtr) -> Option<ObjHandle> {
        self.table.get(obj).map(|r| ObjHandle {
            ptr: obj,
            serial: r.serial,
        })
    }

    /// Whether the object a handle was issued for is still tracked.
    ///
    /// False once it was freed, even if the address now belongs to a newer
    /// object.
    pub fn is_live(&self, handle: ObjHandle) -> bool {
        self.resolve(handle).is_some()
    }

    /// Resolve a handle to its payload address if still live.
    pub fn resolve(&self, handle: ObjHandle) -> Option<ObjPtr> {
        self.table
            .get(handle.ptr)
            .filter(|r| r.serial == handle.serial)
            .map(|r| r.payload)
    }

    /// Number of tracked objects.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no objects are tracked.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterate tracked objects in table order.
    pub fn objects(&self) -> impl Iterator<Item = &TrackedObject> {
        self.table.iter()
    }

    /// Payload bytes currently tracked.
    pub fn tracked_bytes(&self) -> usize {
        self.system.allocated_bytes()
    }

    /// Get current statistics.
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            tracked_objects: self.table.len(),
            tracked_bytes: self.system.allocated_bytes(),
            peak_bytes: self.counters.peak_bytes,
            registered_pointers: self.registry.len(),
            allocation_count: self.system.allocation_count(),
            free_count: self.counters.free_count,
            custom_destructor_runs: self.counters.custom_destructor_runs,
            conservative_scans: self.counters.conservative_scans,
            scan_matches: self.counters.scan_matches,
            collection_passes: self.counters.collection_passes,
            shutdown_reclaimed: self.counters.shutdown_reclaimed,
        }
    }

    // ==================== Configuration ====================

    /// Set the maximum number of objects one pass or cascade may free.
    ///
    /// Takes effect on the next pass. `0` disables reclamation;
    /// `usize::MAX` removes the bound.
    pub fn set_cascade_limit(&mut self, limit: usize) {
        if limit == 0 {
            emit(&RM201);
        }
        self.config.cascade_limit = limit;
    }

    /// Current cascade limit.
    pub fn cascade_limit(&self) -> usize {
        self.config.cascade_limit
    }

    // ==================== Shutdown ====================

    /// Free every tracked object regardless of its reference count.
    ///
    /// Destructors are not run. Returns the number of objects freed;
    /// calling it on an empty heap is a no-op.
    pub fn shutdown(&mut self) -> usize {
        let (reclaimed, live) = self.teardown();
        if live > 0 {
            emit_with_context(
                &RM301,
                &format!("{} of {} objects still retained", live, reclaimed),
            );
        }
        reclaimed
    }

    fn teardown(&mut self) -> (usize, usize) {
        let records = self.table.take_all();
        let reclaimed = records.len();
        let live = records.iter().filter(|r| r.refcount > 0).count();

        for record in records {
            #[cfg(feature = "debug")]
            self.traces.record_free(record.payload.addr());

            // SAFETY: the payload was allocated by `system` with `record.size`
            // and its record has just been removed.
            unsafe {
                self.system.dealloc(record.payload.as_non_null(), record.size);
            }
        }

        self.registry.clear();
        self.counters.shutdown_reclaimed += reclaimed as u64;
        (reclaimed, live)
    }

    /// Report of objects still tracked, with their allocation backtraces.
    #[cfg(feature = "debug")]
    pub fn leak_report(&self) -> String {
        self.traces.leak_report()
    }

    fn report_untracked(&self, op: &str, obj: ObjPtr) {
        if is_verbose() {
            emit_with_context(&RM101, &format!("{} on {:?}", op, obj));
        }
    }
}

impl Default for RefHeap {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Drop for RefHeap {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for RefHeap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefHeap")
            .field("tracked_objects", &self.table.len())
            .field("tracked_bytes", &self.system.allocated_bytes())
            .field("cascade_limit", &self.config.cascade_limit)
            .finish()
    }
}
