//! Heap statistics.

use crate::util::size::format_bytes;

/// Aggregated heap statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects currently tracked.
    pub tracked_objects: usize,

    /// Payload bytes currently tracked.
    pub tracked_bytes: usize,

    /// Peak payload bytes tracked (high water mark).
    pub peak_bytes: usize,

    /// Addresses currently in the pointer registry.
    pub registered_pointers: usize,

    /// Total number of allocations performed.
    pub allocation_count: u64,

    /// Total number of objects physically freed (excluding shutdown).
    pub free_count: u64,

    /// Custom destructors run.
    pub custom_destructor_runs: u64,

    /// Conservative scans run.
    pub conservative_scans: u64,

    /// Registered addresses found by conservative scans.
    pub scan_matches: u64,

    /// Bounded collection passes run.
    pub collection_passes: u64,

    /// Objects reclaimed by shutdown.
    pub shutdown_reclaimed: u64,
}

impl HeapStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Destructors run of either kind.
    pub fn destructor_runs(&self) -> u64 {
        self.custom_destructor_runs + self.conservative_scans
    }
}

impl std::fmt::Display for HeapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Heap Statistics:")?;
        writeln!(f, "  Tracked objects:  {}", self.tracked_objects)?;
        writeln!(f, "  Tracked bytes:    {}", format_bytes(self.tracked_bytes))?;
        writeln!(f, "  Peak bytes:       {}", format_bytes(self.peak_bytes))?;
        writeln!(f, "  Registered ptrs:  {}", self.registered_pointers)?;
        writeln!(f, "  Allocations:      {}", self.allocation_count)?;
        writeln!(f, "  Frees:            {}", self.free_count)?;
        writeln!(f, "  Destructor runs:  {}", self.destructor_runs())?;
        writeln!(f, "  Scan matches:     {}", self.scan_matches)?;
        writeln!(f, "  Passes:           {}", self.collection_passes)?;
        writeln!(f, "  Shutdown freed:   {}", self.shutdown_reclaimed)?;
        Ok(())
    }
}

/// Counters kept by the heap between snapshots.
#[derive(Debug, Default)]
pub(crate) struct HeapCounters {
    pub peak_bytes: usize,
    pub free_count: u64,
    pub custom_destructor_runs: u64,
    pub conservative_scans: u64,
    pub scan_matches: u64,
    pub collection_passes: u64,
    pub shutdown_reclaimed: u64,
}

impl HeapCounters {
    pub fn record_alloc(&mut self, tracked_bytes: usize) {
        self.peak_bytes = self.peak_bytes.max(tracked_bytes);
    }
}
