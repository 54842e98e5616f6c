use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::event::LogEvent;

/// Errors that end a trace stream, or prevent one from being opened.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Could not reach the server (DNS, TLS handshake, connection refused).
    Connect(String),
    /// The server answered the subscribe request with a non-2xx status.
    Api { status: u16, message: String },
    /// The connection failed after the stream was established.
    Network(String),
    /// The server sent a line that is not a valid event.
    Decode(String),
    /// The client certificate or key could not be loaded.
    Identity(String),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Connect(msg) => write!(f, "connection error: {msg}"),
            StreamError::Api { status, message } => {
                write!(f, "server error (HTTP {status}): {message}")
            }
            StreamError::Network(msg) => write!(f, "network error: {msg}"),
            StreamError::Decode(msg) => write!(f, "invalid event: {msg}"),
            StreamError::Identity(msg) => write!(f, "client identity error: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {}

/// One event as delivered by the server: the decoded value plus the raw
/// JSON line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub raw: String,
    pub event: LogEvent,
}

/// Requests termination of a stream from any thread.
///
/// Cloning is cheap and every clone refers to the same stream. Only the
/// first `close()` has an effect; later calls return `false`.
#[derive(Clone, Debug)]
pub struct CloseHandle {
    closed: Arc<watch::Sender<bool>>,
}

impl Default for CloseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseHandle {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            closed: Arc::new(closed),
        }
    }

    /// Marks the stream closed. Returns `true` if this call did the closing.
    pub fn close(&self) -> bool {
        self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// A receiver that observes the close flag, for async waiters.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Resolves once `close()` has been called.
    pub async fn closed(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// An ordered, blocking source of log events.
pub trait EventStream: Send {
    /// Blocks until the next record is available.
    ///
    /// Returns `None` once the stream has ended, whether through `close()`,
    /// the server finishing the response, or an error (see [`err`]).
    ///
    /// [`err`]: EventStream::err
    fn next_event(&mut self) -> Option<TraceRecord>;

    /// The error that ended the stream, if it ended abnormally.
    fn err(&self) -> Option<&StreamError>;

    /// A handle that can close this stream while `next_event` is blocked.
    fn close_handle(&self) -> CloseHandle;

    fn close(&self) -> bool {
        self.close_handle().close()
    }
}
