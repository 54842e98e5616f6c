//! The terminal surface, acquired once per trace session.
//!
//! Acquiring puts the terminal into raw mode on the alternate screen;
//! releasing restores it. Release happens exactly once, in
//! [`Renderer::release`] or in `Drop`, whichever comes first, so every
//! exit path (including panics and early `?` returns) leaves the terminal
//! usable.
//!
//! [`paint_to_scrollback`] draws the table one last time after release, in
//! an inline viewport on the normal screen, so it outlives the session.

use std::io::Stdout;

use log::{debug, info};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Position;
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::core::state::TraceState;
use crate::tui::TuiError;
use crate::tui::ui;

type Restore = Box<dyn FnOnce()>;

pub struct Renderer<B: Backend> {
    terminal: Terminal<B>,
    restore: Option<Restore>,
}

impl Renderer<CrosstermBackend<Stdout>> {
    /// Takes over stdout: raw mode, alternate screen.
    pub fn acquire() -> Result<Self, TuiError> {
        let terminal = ratatui::try_init().map_err(TuiError::TerminalInit)?;
        info!("Terminal acquired");
        Ok(Self::new(terminal, ratatui::restore))
    }
}

impl<B: Backend> Renderer<B> {
    /// Wraps an already initialized terminal. `restore` runs once on release.
    pub fn new(terminal: Terminal<B>, restore: impl FnOnce() + 'static) -> Self {
        Self {
            terminal,
            restore: Some(Box::new(restore)),
        }
    }

    /// Full repaint of the session state at the terminal's current size.
    pub fn paint(&mut self, state: &TraceState) -> Result<(), TuiError> {
        self.terminal
            .draw(|frame| ui::draw_ui(frame, state))
            .map_err(paint_error)?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.terminal.backend_mut()
    }

    /// Gives the terminal back to the shell.
    pub fn release(mut self) {
        self.restore_once();
    }

    fn restore_once(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
            info!("Terminal released");
        } else {
            debug!("Terminal already released");
        }
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if self.restore.is_some() {
            self.restore_once();
        }
    }
}

/// Paints the header and the newest rows that fit into an inline viewport
/// at the cursor, then leaves the cursor on the last painted line.
///
/// Returns `None` without touching the terminal when there are no rows.
pub fn paint_to_scrollback<B: Backend>(
    backend: B,
    state: &TraceState,
) -> Result<Option<Terminal<B>>, TuiError> {
    let screen = backend.size().map_err(paint_error)?;
    let rows = u16::try_from(state.table.len()).unwrap_or(u16::MAX);
    let height = rows.saturating_add(1).min(screen.height);
    if state.table.is_empty() || height == 0 {
        return Ok(None);
    }

    let options = TerminalOptions {
        viewport: Viewport::Inline(height),
    };
    let mut terminal = Terminal::with_options(backend, options).map_err(paint_error)?;
    let area = terminal
        .draw(|frame| ui::draw_table(frame, state))
        .map_err(paint_error)?
        .area;
    terminal
        .set_cursor_position(Position::new(0, area.bottom().saturating_sub(1)))
        .map_err(paint_error)?;
    terminal.show_cursor().map_err(paint_error)?;
    debug!("Left {} rows on screen", height - 1);
    Ok(Some(terminal))
}

fn paint_error(e: impl std::fmt::Display) -> TuiError {
    TuiError::Paint(e.to_string())
}
