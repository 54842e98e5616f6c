//! kestrace library exports for testing

use std::fmt;

use clap::ValueEnum;

pub mod api;
pub mod core;
pub mod output;
pub mod signal;
pub mod tui;

#[cfg(test)]
pub mod test_support;

/// Which server log a trace session subscribes to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TraceKind {
    #[default]
    Audit,
    Error,
}

impl TraceKind {
    /// Path segment used by the server's trace endpoints.
    pub fn as_str(self) -> &'static str {
        match self {
            TraceKind::Audit => "audit",
            TraceKind::Error => "error",
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
