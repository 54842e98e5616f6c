//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use crate::api::{CloseHandle, EventStream, StreamError, TraceRecord};
use crate::core::event::{AuditEvent, AuditRequest, AuditResponse, ErrorEvent, LogEvent};
use crate::tui::renderer::Renderer;

/// What a [`ScriptedStream`] does after its last event.
#[derive(Debug, Clone)]
pub enum End {
    /// Ends cleanly, as if the server closed the response.
    Finish,
    /// Ends with the given error.
    Fail(StreamError),
    /// Blocks until closed, like a live server with nothing more to say.
    HoldOpen,
}

/// An in-memory stream that replays a fixed list of events.
pub struct ScriptedStream {
    events: VecDeque<LogEvent>,
    end: End,
    err: Option<StreamError>,
    closer: CloseHandle,
}

impl ScriptedStream {
    pub fn new(events: Vec<LogEvent>, end: End) -> Self {
        Self {
            events: events.into(),
            end,
            err: None,
            closer: CloseHandle::new(),
        }
    }
}

impl EventStream for ScriptedStream {
    fn next_event(&mut self) -> Option<TraceRecord> {
        if self.closer.is_closed() {
            return None;
        }
        if let Some(event) = self.events.pop_front() {
            return Some(TraceRecord {
                raw: raw_json(&event),
                event,
            });
        }
        match &self.end {
            End::Finish => {}
            End::Fail(e) => self.err = Some(e.clone()),
            End::HoldOpen => futures::executor::block_on(self.closer.closed()),
        }
        None
    }

    fn err(&self) -> Option<&StreamError> {
        self.err.as_ref()
    }

    fn close_handle(&self) -> CloseHandle {
        self.closer.clone()
    }
}

fn raw_json(event: &LogEvent) -> String {
    let encoded = match event {
        LogEvent::Audit(audit) => serde_json::to_string(audit),
        LogEvent::Error(error) => serde_json::to_string(error),
    };
    encoded.unwrap()
}

pub fn error_event(message: &str) -> LogEvent {
    LogEvent::Error(ErrorEvent {
        message: message.to_string(),
    })
}

/// An audit event for `POST /v1/key/create/my-key` at 2024-03-01 10:02:03 UTC.
pub fn audit_event(code: u16, millis: u64) -> LogEvent {
    LogEvent::Audit(AuditEvent {
        time: Utc.with_ymd_and_hms(2024, 3, 1, 10, 2, 3).unwrap(),
        request: AuditRequest {
            path: "/v1/key/create/my-key".to_string(),
            identity: "3ecfcdf38fcbe141ae26a1030f81e96b".to_string(),
        },
        response: AuditResponse {
            status_code: code,
            duration: Duration::from_millis(millis),
        },
    })
}

/// A renderer over an in-memory terminal, plus a count of how many times
/// it restored the terminal.
pub fn test_renderer(width: u16, height: u16) -> (Renderer<TestBackend>, Arc<AtomicUsize>) {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    let terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    let renderer = Renderer::new(terminal, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (renderer, released)
}

/// The current screen, one string per line.
pub fn screen(renderer: &Renderer<TestBackend>) -> Vec<String> {
    let buffer = renderer.backend().buffer();
    (0..buffer.area.height)
        .map(|y| {
            (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol())
                .collect()
        })
        .collect()
}
