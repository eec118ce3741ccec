//! Core heap structures: the object table, the pointer registry and the
//! collector that reclaims through them.

pub mod collector;
pub(crate) mod registry;
pub mod table;
