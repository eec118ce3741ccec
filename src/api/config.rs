//! Heap configuration.

/// Cascade limit meaning "no bound".
pub const UNBOUNDED: usize = usize::MAX;

/// Configuration for a [`RefHeap`](crate::RefHeap).
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Maximum number of objects freed by one bounded pass or one release
    /// cascade (default: unbounded)
    pub cascade_limit: usize,

    /// Run bounded collection passes before each allocation
    pub collect_on_allocate: bool,

    /// Initial capacity of the object table
    pub initial_capacity: usize,

    /// Capture an allocation backtrace per object (`debug` feature only)
    pub track_backtraces: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            cascade_limit: UNBOUNDED,
            collect_on_allocate: true,
            initial_capacity: 64,
            track_backtraces: cfg!(feature = "debug"),
        }
    }
}

impl HeapConfig {
    /// Config that frees at most `limit` objects per pass or cascade.
    pub fn incremental(limit: usize) -> Self {
        Self {
            cascade_limit: limit,
            ..Self::default()
        }
    }

    /// Config that only reclaims on release, `collect()` and `cleanup()`.
    pub fn manual() -> Self {
        Self {
            collect_on_allocate: false,
            ..Self::default()
        }
    }

    /// Builder pattern: set cascade limit.
    pub fn with_cascade_limit(mut self, limit: usize) -> Self {
        self.cascade_limit = limit;
        self
    }

    /// Builder pattern: enable or disable collection before allocation.
    pub fn with_collect_on_allocate(mut self, enable: bool) -> Self {
        self.collect_on_allocate = enable;
        self
    }

    /// Builder pattern: set initial object table capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Builder pattern: enable allocation backtraces.
    pub fn with_backtraces(mut self, enable: bool) -> Self {
        self.track_backtraces = enable;
        self
    }
}
