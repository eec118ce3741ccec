//! # refmem
//!
//! A manually managed, reference-counted heap.
//!
//! ## Features
//!
//! - Zeroed allocation with an explicit reference count per object
//! - Custom destructors, or a conservative default destructor that
//!   releases every tracked address stored in the object
//! - Release cascades and collection passes bounded by a cascade limit,
//!   so freeing a long chain can be spread over several passes
//! - Overflow-checked array allocation
//! - Reuse-checked handles (`ObjHandle`)
//! - A thread-shared heap with lock-free deferred releases
//! - Thread-local free functions over raw pointers (`global`)
//! - Coded diagnostics with strict mode
//!
//! ## Quick Start
//!
//! ```rust
//! use refmem::{destructor, HeapConfig, RefHeap};
//!
//! let mut heap = RefHeap::new(HeapConfig::incremental(16));
//!
//! let node = heap.allocate(32, destructor(|_heap, obj| {
//!     println!("dropping {:?}", obj);
//! })).unwrap();
//!
//! heap.retain(node);
//! assert_eq!(heap.rc(node), 1);
//! heap.release(node); // freed here
//!
//! heap.shutdown();
//! ```

pub mod api;
pub mod diagnostics;

#[allow(dead_code)]
mod allocators;
#[allow(dead_code)]
mod core;
#[allow(dead_code)]
mod sync;
#[allow(dead_code)]
mod util;

#[cfg(feature = "debug")]
#[allow(dead_code)]
mod debug;

// Re-export public API at crate root for convenience
pub use api::config::{HeapConfig, UNBOUNDED};
pub use api::error::AllocError;
pub use api::global;
pub use api::handle::{ObjHandle, ObjPtr, ObjState};
pub use api::heap::RefHeap;
pub use api::shared::SharedHeap;
pub use api::stats::HeapStats;

pub use crate::core::collector::PassReport;
pub use crate::core::table::{destructor, DestructorFn, TrackedObject};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{set_strict_mode, StrictMode, StrictModeGuard};
pub use diagnostics::{RM001, RM002, RM003, RM101, RM201, RM202, RM301};
