//! Line output for non-interactive use.
//!
//! When stdout is not a terminal (or `--json` is given), each event is
//! written as the raw JSON line the server sent, one per line. Nothing
//! else goes to stdout, so the output can be piped straight into `jq`.

use std::io::{self, Write};

use log::{debug, info};
use tokio::runtime::Handle;

use crate::api::EventStream;
use crate::core::action::Outcome;
use crate::signal;

/// Copies every record of `stream` to `out`, flushing after each line.
///
/// A write error (e.g. a closed pipe) closes the stream and is returned.
pub fn print_records<W: Write>(stream: &mut dyn EventStream, out: &mut W) -> io::Result<Outcome> {
    let mut count = 0u64;
    while let Some(record) = stream.next_event() {
        let written = writeln!(out, "{}", record.raw).and_then(|_| out.flush());
        if let Err(e) = written {
            stream.close();
            return Err(e);
        }
        count += 1;
    }
    info!("Printed {} events", count);

    let outcome = if stream.close_handle().is_closed() {
        if let Some(e) = stream.err() {
            debug!("Stream error after close ignored: {}", e);
        }
        Outcome::Cancelled
    } else if let Some(e) = stream.err() {
        Outcome::Failed(e.clone())
    } else {
        Outcome::Completed
    };
    Ok(outcome)
}

/// Streams to stdout until the server closes the stream or a shutdown
/// signal arrives.
pub fn run(mut stream: Box<dyn EventStream>, runtime: &Handle) -> io::Result<Outcome> {
    let closer = stream.close_handle();
    let listener = signal::on_shutdown_signal(runtime, move || {
        closer.close();
    });
    let stdout = io::stdout();
    let result = print_records(stream.as_mut(), &mut stdout.lock());
    listener.abort();
    result
}
