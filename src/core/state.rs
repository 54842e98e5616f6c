//! # Trace Session State
//!
//! Everything one trace session owns, in one place. Presentation details
//! (colors, widgets, the terminal itself) live in the `tui` module.
//!
//! ```text
//! TraceState
//! ├── kind: TraceKind     // audit or error log
//! ├── table: Table        // headers + buffered rows
//! ├── phase: Phase        // Running → Draining → Closed
//! └── received: u64       // events seen this session
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use crate::TraceKind;
use crate::core::format::{AUDIT_COLUMNS, ERROR_COLUMNS, table_with};
use crate::core::table::Table;

/// Lifecycle of a trace session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Consuming events and painting them.
    Running,
    /// Cancel requested; waiting for the stream to report its end.
    Draining,
    /// Stream ended. Nothing changes after this.
    Closed,
}

pub struct TraceState {
    pub kind: TraceKind,
    pub table: Table,
    pub phase: Phase,
    pub received: u64,
}

impl TraceState {
    pub fn new(kind: TraceKind, history: usize) -> Self {
        let columns = match kind {
            TraceKind::Audit => &AUDIT_COLUMNS[..],
            TraceKind::Error => &ERROR_COLUMNS[..],
        };
        Self {
            kind,
            table: table_with(columns, history),
            phase: Phase::Running,
            received: 0,
        }
    }
}
