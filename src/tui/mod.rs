//! # TUI Adapter
//!
//! The ratatui-specific layer. Owns the terminal for one trace session,
//! paints the event table, and turns terminal input into `core::Action`s.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Single Owner
//!
//! Three activities produce input: the stream reader, the terminal
//! listener, and the signal listener (see [`event`]). They share one
//! `std::sync::mpsc` channel and never paint. [`drive`] is the only code
//! that receives from it, applies `update()`, and touches the terminal, so
//! paints are serialized and rows appear in arrival order.
//!
//! ## Shutdown
//!
//! A cancel only asks the stream to close. The loop keeps running until the
//! reader reports the end of the stream, paints once more, and returns.
//! [`run`] then releases the terminal and stops every worker, in that
//! order, on every exit path. Last, the table is painted once more below
//! the shell prompt so it stays in the scrollback.

mod component;
mod components;
pub mod event;
pub mod renderer;
mod ui;

use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver};

use log::{debug, info, warn};
use ratatui::backend::{Backend, CrosstermBackend};
use tokio::runtime::Handle;

use crate::TraceKind;
use crate::api::{CloseHandle, EventStream};
use crate::core::action::{Action, Effect, Outcome, update};
use crate::core::state::TraceState;
use crate::tui::event::Workers;
use crate::tui::renderer::Renderer;

#[derive(Debug)]
pub enum TuiError {
    /// The terminal could not be put into raw/alternate-screen mode.
    TerminalInit(io::Error),
    /// Drawing to the terminal failed mid-session.
    Paint(String),
    /// A worker thread could not be started.
    Spawn(io::Error),
}

impl fmt::Display for TuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuiError::TerminalInit(e) => write!(f, "failed to initialize terminal: {e}"),
            TuiError::Paint(msg) => write!(f, "failed to draw: {msg}"),
            TuiError::Spawn(e) => write!(f, "failed to start worker: {e}"),
        }
    }
}

impl std::error::Error for TuiError {}

/// Runs an interactive trace session until the user quits or the stream
/// ends. The terminal is released before this returns.
pub fn run(
    stream: Box<dyn EventStream>,
    kind: TraceKind,
    history: usize,
    runtime: &Handle,
) -> Result<Outcome, TuiError> {
    let closer = stream.close_handle();
    let mut state = TraceState::new(kind, history);
    let mut renderer = Renderer::acquire()?;

    let (tx, rx) = mpsc::channel();
    let mut workers = Workers::new();
    workers
        .spawn_reader(stream, tx.clone())
        .map_err(TuiError::Spawn)?;
    workers
        .spawn_terminal_listener(tx.clone())
        .map_err(TuiError::Spawn)?;
    workers.spawn_signal_listener(runtime, tx);

    let result = drive(&mut state, &mut renderer, &closer, &rx);
    if let Err(e) = &result {
        warn!("Session aborted: {}", e);
    }

    closer.close();
    renderer.release();
    workers.shutdown();

    if result.is_ok() {
        leave_on_screen(&state);
    }
    info!("Trace session ended after {} events", state.received);
    result
}

/// Paints the final table once more on the normal screen so it stays in
/// the shell's scrollback after the alternate screen is gone.
fn leave_on_screen(state: &TraceState) {
    match renderer::paint_to_scrollback(CrosstermBackend::new(io::stdout()), state) {
        Ok(Some(terminal)) => {
            // Restores the cursor; the newline puts the prompt below the table.
            drop(terminal);
            println!();
        }
        Ok(None) => debug!("No rows to leave on screen"),
        Err(e) => warn!("Could not leave the table on screen: {}", e),
    }
}

/// The session loop: receive an action, apply it, carry out its effect.
///
/// Returns once the stream has ended, after one final paint.
pub fn drive<B: Backend>(
    state: &mut TraceState,
    renderer: &mut Renderer<B>,
    closer: &CloseHandle,
    rx: &Receiver<Action>,
) -> Result<Outcome, TuiError> {
    renderer.paint(state)?;
    loop {
        let action = rx.recv().unwrap_or_else(|_| {
            warn!("All event sources stopped without an end-of-stream");
            Action::StreamEnded(None)
        });
        match update(state, action) {
            Effect::None => {}
            Effect::Redraw => renderer.paint(state)?,
            Effect::CloseStream => {
                if closer.close() {
                    debug!("Stream close requested");
                }
                renderer.paint(state)?;
            }
            Effect::Finish(outcome) => {
                renderer.paint(state)?;
                return Ok(outcome);
            }
        }
    }
}
