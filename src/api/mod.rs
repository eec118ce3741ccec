//! Public API for refmem.
//!
//! This module contains all user-facing types and functions.
//! Most users only need `RefHeap`, `SharedHeap` or the `global` functions.

pub mod config;
pub mod error;
pub mod global;
pub mod handle;
pub mod heap;
pub mod shared;
pub mod stats;
