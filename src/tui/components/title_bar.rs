//! # TitleBar Component
//!
//! Single status line above the table.
//!
//! ## Responsibilities
//!
//! - Name the log being traced (audit or error)
//! - Count the events received this session
//! - Tell the user how to quit, or that the session is closing
//!
//! ## Design Decisions
//!
//! TitleBar is purely presentational: it receives all data as props and
//! has no internal state.
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(state.kind, state.received, state.phase);
//! title_bar.render(frame, area);
//! ```
//!
//! The title text changes with the session phase:
//!
//! 1. **Running**: `" kestrace │ audit log │ 12 events │ Esc/Ctrl-C to quit"`
//! 2. **Draining**: `" kestrace │ audit log │ 12 events │ closing…"`

use crate::TraceKind;
use crate::core::state::Phase;
use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

pub struct TitleBar {
    pub kind: TraceKind,
    pub received: u64,
    pub phase: Phase,
}

impl TitleBar {
    pub fn new(kind: TraceKind, received: u64, phase: Phase) -> Self {
        Self {
            kind,
            received,
            phase,
        }
    }

    pub fn text(&self) -> String {
        let events = match self.received {
            1 => "1 event".to_string(),
            n => format!("{n} events"),
        };
        let hint = match self.phase {
            Phase::Running => "Esc/Ctrl-C to quit",
            Phase::Draining | Phase::Closed => "closing…",
        };
        format!(" kestrace │ {} log │ {events} │ {hint}", self.kind)
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let style = Style::default().add_modifier(Modifier::REVERSED);
        frame.render_widget(Span::styled(self.text(), style), area);
    }
}
