//! Allocation backtraces.
//!
//! Each tracked payload remembers where it was allocated so that objects
//! still tracked at teardown can be traced back to their allocation site.

use rustc_hash::FxHashMap;

/// Where and when one payload was allocated.
#[derive(Debug, Clone)]
pub struct AllocationTrace {
    /// Payload address
    pub address: usize,

    /// Payload size
    pub size: usize,

    /// Allocation serial
    pub serial: u64,

    /// Captured backtrace
    pub backtrace: String,
}

/// Backtraces of payloads that are currently allocated.
#[derive(Debug, Default)]
pub struct BacktraceTracker {
    traces: FxHashMap<usize, AllocationTrace>,
}

impl BacktraceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a backtrace for a new payload.
    pub fn record_alloc(&mut self, address: usize, size: usize, serial: u64) {
        let bt = backtrace::Backtrace::new();
        self.traces.insert(
            address,
            AllocationTrace {
                address,
                size,
                serial,
                backtrace: format!("{:?}", bt),
            },
        );
    }

    /// Forget a freed payload. Untracked addresses are ignored.
    pub fn record_free(&mut self, address: usize) {
        self.traces.remove(&address);
    }

    /// Traces of every payload not yet freed, oldest first.
    pub fn active_allocations(&self) -> Vec<AllocationTrace> {
        let mut active: Vec<_> = self.traces.values().cloned().collect();
        active.sort_by_key(|t| t.serial);
        active
    }

    /// Human-readable report of payloads not yet freed.
    pub fn leak_report(&self) -> String {
        use std::fmt::Write;

        let active = self.active_allocations();
        if active.is_empty() {
            return "[refmem] No tracked objects (no leaks detected)\n".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "[refmem] Leak report: {} tracked objects", active.len());
        for trace in &active {
            let _ = writeln!(
                out,
                "  #{} at 0x{:x}, {} bytes",
                trace.serial, trace.address, trace.size
            );
            let _ = writeln!(out, "{}", trace.backtrace);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_free() {
        let mut tracker = BacktraceTracker::new();
        tracker.record_alloc(0x1000, 16, 1);
        tracker.record_alloc(0x2000, 32, 2);
        tracker.record_free(0x1000);
        tracker.record_free(0x3000);

        let active = tracker.active_allocations();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].serial, 2);
        assert!(tracker.leak_report().contains("1 tracked objects"));

        tracker.record_free(0x2000);
        assert!(tracker.leak_report().contains("no leaks"));
    }
}
