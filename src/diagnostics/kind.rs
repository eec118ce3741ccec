//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Additional context about heap behavior.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `RM0xx` - Allocation issues
/// - `RM1xx` - Handle / refcount issues
/// - `RM2xx` - Collection issues
/// - `RM3xx` - Shutdown issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "RM001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new note diagnostic.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Note,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (RM0xx - Allocation)
// =============================================================================

/// RM001: The system allocator refused a payload.
pub const RM001: Diagnostic = Diagnostic::error(
    "RM001",
    "tracked allocation failed"
).with_note("the system allocator returned null for the payload")
 .with_help("release unused objects or call cleanup() before allocating large payloads");

/// RM002: Array size overflows `usize`.
pub const RM002: Diagnostic = Diagnostic::warning(
    "RM002",
    "array allocation size overflows usize"
).with_note("count * elem_size does not fit in the address space")
 .with_help("check the element count before calling allocate_array()");

/// RM003: Payload size cannot form a valid layout.
pub const RM003: Diagnostic = Diagnostic::warning(
    "RM003",
    "payload size exceeds the maximum layout size"
).with_note("payloads are limited to isize::MAX bytes");

// =============================================================================
// Predefined diagnostics (RM1xx - Handles)
// =============================================================================

/// RM101: Lifetime operation on an address the heap does not track.
pub const RM101: Diagnostic = Diagnostic::note(
    "RM101",
    "retain/release on an untracked address ignored"
).with_note("the address was never allocated here or has already been freed")
 .with_help("use RefHeap::handle() to detect addresses reused after free");

// =============================================================================
// Predefined diagnostics (RM2xx - Collection)
// =============================================================================

/// RM201: Cascade limit of zero disables reclamation.
pub const RM201: Diagnostic = Diagnostic::warning(
    "RM201",
    "cascade limit set to 0, reclamation is disabled"
).with_note("releases and collect() free nothing until the limit is raised")
 .with_help("use set_cascade_limit(usize::MAX) for unbounded reclamation");

/// RM202: A cascade ran out of budget with zero-count objects pending.
pub const RM202: Diagnostic = Diagnostic::note(
    "RM202",
    "cascade budget exhausted, zero-count objects left for a later pass"
).with_help("call collect() or cleanup() to reclaim them");

// =============================================================================
// Predefined diagnostics (RM3xx - Shutdown)
// =============================================================================

/// RM301: Shutdown freed objects that were still retained.
pub const RM301: Diagnostic = Diagnostic::warning(
    "RM301",
    "shutdown reclaimed objects with a nonzero reference count"
).with_note("destructors are not run during shutdown")
 .with_help("release all references before shutdown() to run destructors");
