//! Allocation backends.
//!
//! This module contains the payload heap, the conservative scan and the
//! deferred release queue.
//! **These, together with `RefHeap`'s free path, are the only places that
//! contain `unsafe` code.**

pub(crate) mod deferred;
pub(crate) mod heap;
pub(crate) mod scan;
