//! Debug aids: poison-on-free and per-object allocation backtraces.
//!
//! Only compiled with the `debug` feature.

pub(crate) mod backtrace;
pub(crate) mod poison;
