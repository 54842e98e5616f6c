//! # Actions
//!
//! Everything that can happen during a trace session becomes an `Action`.
//! A new event arrived? That's `Action::EventReceived(event)`.
//! The terminal changed size? That's `Action::Resized`.
//!
//! The `update()` function applies an action to the state and returns the
//! `Effect` the caller must carry out. No I/O here: closing the stream and
//! painting the terminal happen in the TUI driver.
//!
//! ```text
//! State + Action  →  update()  →  Effect
//! ```
//!
//! ```text
//!            EventReceived / Resized
//!              ┌──────┐
//!              ▼      │
//!          ┌─────────┐ CancelRequested ┌──────────┐
//!   start ─►│ Running ├────────────────►│ Draining │
//!          └────┬────┘                 └────┬─────┘
//!               │ StreamEnded               │ StreamEnded
//!               ▼                           ▼
//!          ┌──────────────────────────────────────┐
//!          │                Closed                │
//!          └──────────────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::api::StreamError;
use crate::core::event::LogEvent;
use crate::core::format;
use crate::core::state::{Phase, TraceState};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    EventReceived(LogEvent),
    Resized,
    /// Quit key or termination signal.
    CancelRequested,
    /// The stream's reader saw the end; carries the stream's error, if any.
    StreamEnded(Option<StreamError>),
}

/// How a trace session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The user asked to quit.
    Cancelled,
    /// The server closed the stream without an error.
    Completed,
    /// The stream failed without a preceding cancel.
    Failed(StreamError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Redraw,
    /// Ask the stream to close, then redraw.
    CloseStream,
    /// Paint one last time and leave the loop.
    Finish(Outcome),
}

pub fn update(state: &mut TraceState, action: Action) -> Effect {
    match (state.phase, action) {
        (Phase::Closed, action) => {
            debug!("Ignoring {:?} after close", action);
            Effect::None
        }
        (phase, Action::EventReceived(event)) => {
            state.table.add_row(format::row_for(&event));
            state.received += 1;
            if phase == Phase::Running {
                Effect::Redraw
            } else {
                Effect::None
            }
        }
        (_, Action::Resized) => Effect::Redraw,
        (Phase::Running, Action::CancelRequested) => {
            info!("Cancel requested after {} events", state.received);
            state.phase = Phase::Draining;
            Effect::CloseStream
        }
        (Phase::Draining, Action::CancelRequested) => Effect::None,
        (phase, Action::StreamEnded(err)) => {
            state.phase = Phase::Closed;
            let outcome = match (phase, err) {
                (Phase::Draining, err) => {
                    if let Some(e) = err {
                        debug!("Stream error after cancel ignored: {}", e);
                    }
                    Outcome::Cancelled
                }
                (_, Some(e)) => {
                    warn!("{} log stream failed: {}", state.kind, e);
                    Outcome::Failed(e)
                }
                (_, None) => {
                    info!("{} log stream closed by server", state.kind);
                    Outcome::Completed
                }
            };
            Effect::Finish(outcome)
        }
    }
}
