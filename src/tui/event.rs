//! Event sources feeding the session loop.
//!
//! Each source runs on its own thread or task and only ever sends
//! [`Action`]s into the session channel. None of them touch the terminal
//! or the table.
//!
//! ```text
//!   reader thread     ── EventReceived / StreamEnded ──┐
//!   terminal thread   ── Resized / CancelRequested ────┼──► mpsc ──► drive()
//!   signal task       ── CancelRequested ──────────────┘
//! ```

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::api::{CloseHandle, EventStream};
use crate::core::action::Action;
use crate::signal;

/// How long the terminal thread waits for input before rechecking its stop flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Maps a terminal event to a session action. Ctrl-C and Esc quit.
pub fn translate(event: &Event) -> Option<Action> {
    match event {
        Event::Resize(_, _) => Some(Action::Resized),
        Event::Key(key) if key.kind == KeyEventKind::Press => match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::CancelRequested),
            (_, KeyCode::Esc) => Some(Action::CancelRequested),
            _ => None,
        },
        _ => None,
    }
}

/// Owns every background activity of a session and stops them all on
/// [`Workers::shutdown`] or drop.
#[derive(Default)]
pub struct Workers {
    stop: Arc<AtomicBool>,
    streams: Vec<CloseHandle>,
    threads: Vec<JoinHandle<()>>,
    tasks: Vec<AbortHandle>,
}

impl Workers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the stream to its end on a dedicated thread.
    pub fn spawn_reader(
        &mut self,
        mut stream: Box<dyn EventStream>,
        tx: Sender<Action>,
    ) -> io::Result<()> {
        self.streams.push(stream.close_handle());
        let handle = thread::Builder::new()
            .name("trace-reader".to_string())
            .spawn(move || {
                let mut count = 0usize;
                while let Some(record) = stream.next_event() {
                    count += 1;
                    if tx.send(Action::EventReceived(record.event)).is_err() {
                        debug!("Session gone; reader stopping after {} events", count);
                        return;
                    }
                }
                let err = stream.err().cloned();
                info!("Reader saw end of stream after {} events (error: {:?})", count, err);
                let _ = tx.send(Action::StreamEnded(err));
            })?;
        self.threads.push(handle);
        Ok(())
    }

    /// Forwards resize and quit-key events from the terminal.
    pub fn spawn_terminal_listener(&mut self, tx: Sender<Action>) -> io::Result<()> {
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name("terminal-events".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    let ready = match event::poll(POLL_INTERVAL) {
                        Ok(ready) => ready,
                        Err(e) => {
                            warn!("Terminal event poll failed: {}", e);
                            return;
                        }
                    };
                    if !ready {
                        continue;
                    }
                    match event::read() {
                        Ok(event) => {
                            if let Some(action) = translate(&event)
                                && tx.send(action).is_err()
                            {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Terminal event read failed: {}", e);
                            return;
                        }
                    }
                }
                debug!("Terminal listener stopped");
            })?;
        self.threads.push(handle);
        Ok(())
    }

    /// Turns SIGINT/SIGTERM into a cancel request.
    pub fn spawn_signal_listener(&mut self, runtime: &Handle, tx: Sender<Action>) {
        self.tasks.push(signal::on_shutdown_signal(runtime, move || {
            let _ = tx.send(Action::CancelRequested);
        }));
    }

    /// Stops every activity and waits for the threads to finish.
    ///
    /// Streams are closed first so a reader blocked in `next_event` returns.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        for stream in &self.streams {
            stream.close();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!("{} thread panicked", name);
            }
        }
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        self.shutdown();
    }
}
