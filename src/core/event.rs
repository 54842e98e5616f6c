//! Log events as the server encodes them on its trace endpoints.
//!
//! ```text
//! audit: {"time":"2024-03-01T10:02:03Z",
//!         "request":{"path":"/v1/key/create/my-key","identity":"3ecfcdf3..."},
//!         "response":{"code":200,"time":1234567}}
//! error: {"message":"2024/03/01 10:02:03 disk full on volume X"}
//! ```
//!
//! `response.time` is an integer number of nanoseconds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::TraceKind;

#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Audit(AuditEvent),
    Error(ErrorEvent),
}

impl LogEvent {
    /// Decodes one JSON line from the stream of the given kind.
    pub fn from_json(kind: TraceKind, line: &str) -> Result<Self, serde_json::Error> {
        match kind {
            TraceKind::Audit => serde_json::from_str(line).map(LogEvent::Audit),
            TraceKind::Error => serde_json::from_str(line).map(LogEvent::Error),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub time: DateTime<Utc>,
    pub request: AuditRequest,
    pub response: AuditResponse,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditRequest {
    pub path: String,
    #[serde(default)]
    pub identity: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuditResponse {
    #[serde(rename = "code")]
    pub status_code: u16,
    #[serde(
        rename = "time",
        deserialize_with = "nanos_to_duration",
        serialize_with = "duration_to_nanos"
    )]
    pub duration: Duration,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub message: String,
}

fn nanos_to_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let nanos = i64::deserialize(deserializer)?;
    Ok(Duration::from_nanos(nanos.max(0) as u64))
}

fn duration_to_nanos<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
}
