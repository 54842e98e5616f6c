//! # Row Formatting
//!
//! Pure mapping from a [`LogEvent`] to a table [`Row`]. One function per
//! event kind; [`row_for`] dispatches exhaustively over the variants.
//!
//! Nothing here can fail. An error message without the usual
//! `date time message` prefix still produces a valid two-cell row, stamped
//! with the local wall-clock time instead.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use reqwest::StatusCode;

use crate::core::event::{AuditEvent, ErrorEvent, LogEvent};
use crate::core::table::{Align, Cell, Header, Row, Table, Tone};

/// Column layout of the audit table: (title, width fraction, alignment).
pub const AUDIT_COLUMNS: [(&str, f32, Align); 5] = [
    ("Time", 0.12, Align::Center),
    ("Identity", 0.15, Align::Center),
    ("Status", 0.15, Align::Center),
    ("API Operations", 0.45, Align::Left),
    ("Response", 0.12, Align::Center),
];

/// Column layout of the error table.
pub const ERROR_COLUMNS: [(&str, f32, Align); 2] = [
    ("Time", 0.12, Align::Center),
    ("Error", 0.87, Align::Left),
];

/// Builds an empty table laid out with the given columns.
pub fn table_with(columns: &[(&str, f32, Align)], history: usize) -> Table {
    let mut table = Table::new(columns.iter().map(|(title, _, _)| *title), history);
    for (header, (_, width, align)) in table.headers_mut().iter_mut().zip(columns) {
        *header = Header {
            width: *width,
            align: *align,
            ..header.clone()
        };
    }
    table
}

pub fn row_for(event: &LogEvent) -> Row {
    match event {
        LogEvent::Audit(audit) => audit_row(audit),
        LogEvent::Error(error) => error_row(error),
    }
}

pub fn audit_row(event: &AuditEvent) -> Row {
    let code = event.response.status_code;
    Row::new(vec![
        Cell::new(clock(&event.time.with_timezone(&Local))),
        Cell::new(event.request.identity.clone()),
        Cell::new(status_text(code)).with_tone(status_tone(code)),
        Cell::new(event.request.path.clone()),
        Cell::new(response_time(event.response.duration)),
    ])
}

pub fn error_row(event: &ErrorEvent) -> Row {
    error_row_at(event, Local::now())
}

/// Like [`error_row`], with the fallback timestamp supplied by the caller.
pub fn error_row_at<Tz: TimeZone>(event: &ErrorEvent, now: DateTime<Tz>) -> Row
where
    Tz::Offset: std::fmt::Display,
{
    // "<date> <time> <message>": the time is the 2nd segment, the text the 3rd.
    let segments: Vec<&str> = event.message.splitn(3, ' ').collect();
    let (time, message) = match segments.as_slice() {
        [_, time, message] => (time.to_string(), single_line(message)),
        _ => (clock(&now), single_line(&event.message)),
    };
    Row::new(vec![Cell::new(time), Cell::new(message)])
}

/// `"<code> <reason phrase>"`, or just the code when it has no phrase.
pub fn status_text(code: u16) -> String {
    match StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
    {
        Some(reason) => format!("{code} {reason}"),
        None => code.to_string(),
    }
}

pub fn status_tone(code: u16) -> Tone {
    if code == 200 { Tone::Ok } else { Tone::Alert }
}

/// Truncates a response time to a resolution that matches its magnitude
/// and renders it, e.g. `1.05s`, `345.76ms`, `12µs`.
pub fn response_time(duration: Duration) -> String {
    human_duration(truncate_response_time(duration))
}

pub fn truncate_response_time(duration: Duration) -> Duration {
    let resolution = if duration >= Duration::from_secs(1) {
        Duration::from_millis(10)
    } else if duration >= Duration::from_millis(1) {
        Duration::from_micros(10)
    } else {
        Duration::from_micros(1)
    };
    truncate(duration, resolution)
}

fn truncate(duration: Duration, resolution: Duration) -> Duration {
    let step = resolution.as_nanos();
    let nanos = duration.as_nanos() / step * step;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Renders a duration with the largest natural unit: `0s`, `750ns`,
/// `12.5µs`, `345.76ms`, `1.23s`, `2m5.5s`, `1h0m3s`.
pub fn human_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    match nanos {
        0 => "0s".to_string(),
        1..=999 => format!("{nanos}ns"),
        1_000..=999_999 => format!("{}µs", decimal(nanos, 3)),
        1_000_000..=999_999_999 => format!("{}ms", decimal(nanos, 6)),
        _ => {
            let total_secs = nanos / 1_000_000_000;
            let (hours, minutes) = (total_secs / 3600, total_secs / 60 % 60);
            let seconds = decimal(nanos % 60_000_000_000, 9);
            if hours > 0 {
                format!("{hours}h{minutes}m{seconds}s")
            } else if minutes > 0 {
                format!("{minutes}m{seconds}s")
            } else {
                format!("{seconds}s")
            }
        }
    }
}

/// `value / 10^digits` as a decimal with trailing zeros dropped.
fn decimal(value: u128, digits: u32) -> String {
    let scale = 10u128.pow(digits);
    let (whole, fraction) = (value / scale, value % scale);
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:0width$}", width = digits as usize);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

fn clock<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S").to_string()
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ")
}
