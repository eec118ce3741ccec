//! Heap diagnostics.
//!
//! This module provides:
//! - **Runtime diagnostics**: Heap-aware messages with codes
//! - **Sinks**: Per-thread collection of diagnostics for tests and tools
//! - **Strict mode**: Optional panic-on-error for CI
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | RM0xx | Allocation issues              |
//! | RM1xx | Handle / refcount issues       |
//! | RM2xx | Collection issues              |
//! | RM3xx | Shutdown issues                |
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use refmem::diagnostics::{set_thread_sink, CollectingSink};
//! use refmem::RefHeap;
//!
//! let sink = Arc::new(CollectingSink::new());
//! set_thread_sink(Some(sink.clone()));
//!
//! let mut heap = RefHeap::with_defaults();
//! heap.set_cascade_limit(0);
//! assert_eq!(sink.codes(), vec!["RM201"]);
//! # set_thread_sink(None);
//! ```

pub mod emit;
pub mod kind;
pub mod strict;

pub use emit::{
    emit, emit_with_context, is_verbose, set_thread_sink, set_verbose, suppress_diagnostics,
    CollectingSink, DiagnosticSink,
};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

pub use kind::{RM001, RM002, RM003, RM101, RM201, RM202, RM301};
