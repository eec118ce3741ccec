//! Small helpers shared by the allocator backends and the public API.

pub(crate) mod layout;
pub(crate) mod size;
