//! Object table.
//!
//! An ordered sequence of records, one per tracked allocation. Order is
//! allocation order and is what collection passes walk; lookups are linear
//! by payload address.

use crate::api::handle::ObjPtr;
use crate::api::heap::RefHeap;

/// A custom destructor.
///
/// Invoked exactly once, with the heap and the payload, when the object is
/// physically freed. The payload is still readable; its record has already
/// been removed from the table. Releases issued through the heap argument
/// join the running cascade instead of recursing.
pub type DestructorFn = Box<dyn FnMut(&mut RefHeap, ObjPtr) + Send>;

/// Wrap a closure as a custom destructor for `allocate`.
///
/// ```rust
/// use refmem::{destructor, RefHeap};
///
/// let mut heap = RefHeap::with_defaults();
/// let obj = heap.allocate(8, destructor(|_heap, obj| {
///     println!("freeing {:?}", obj);
/// })).unwrap();
/// heap.retain(obj);
/// heap.release(obj);
/// ```
pub fn destructor<F>(f: F) -> Option<DestructorFn>
where
    F: FnMut(&mut RefHeap, ObjPtr) + Send + 'static,
{
    Some(Box::new(f))
}

/// How an object is torn down when freed.
pub(crate) enum Destructor {
    /// Scan the payload for registered addresses and release them.
    Conservative,
    /// Run a client-supplied closure.
    Custom(DestructorFn),
}

impl std::fmt::Debug for Destructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destructor::Conservative => write!(f, "Conservative"),
            Destructor::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Record for one tracked allocation.
#[derive(Debug)]
pub struct TrackedObject {
    pub(crate) payload: ObjPtr,
    pub(crate) refcount: usize,
    pub(crate) size: usize,
    pub(crate) destructor: Destructor,
    pub(crate) serial: u64,
}

impl TrackedObject {
    /// The payload address handed to the client.
    pub fn payload(&self) -> ObjPtr {
        self.payload
    }

    /// Current reference count.
    pub fn refcount(&self) -> usize {
        self.refcount
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocation serial of this record.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether the object is torn down by the conservative scan.
    pub fn is_conservative(&self) -> bool {
        matches!(self.destructor, Destructor::Conservative)
    }
}

/// Ordered table of tracked objects.
#[derive(Debug, Default)]
pub struct ObjectTable {
    records: Vec<TrackedObject>,
}

impl ObjectTable {
    /// Create an empty table with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record.
    pub fn push(&mut self, record: TrackedObject) {
        self.records.push(record);
    }

    /// Position of the record for `payload`.
    pub fn index_of(&self, payload: ObjPtr) -> Option<usize> {
        self.records.iter().position(|r| r.payload == payload)
    }

    /// Record for `payload`.
    pub fn get(&self, payload: ObjPtr) -> Option<&TrackedObject> {
        self.records.iter().find(|r| r.payload == payload)
    }

    /// Mutable record for `payload`.
    pub fn get_mut(&mut self, payload: ObjPtr) -> Option<&mut TrackedObject> {
        self.records.iter_mut().find(|r| r.payload == payload)
    }

    /// Record at `index`.
    pub fn at(&self, index: usize) -> Option<&TrackedObject> {
        self.records.get(index)
    }

    /// Remove the record at `index`, shifting later records down.
    pub fn remove(&mut self, index: usize) -> TrackedObject {
        self.records.remove(index)
    }

    /// Remove every record, oldest first.
    pub fn take_all(&mut self) -> Vec<TrackedObject> {
        std::mem::take(&mut self.records)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in table order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> {
        self.records.iter()
    }
}
