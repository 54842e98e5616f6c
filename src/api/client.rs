//! HTTP client for the server's trace endpoints.
//!
//! `GET /v1/log/{audit|error}/trace` answers with a never-ending body of
//! newline-delimited JSON, one event per line. A background task reads the
//! body, decodes lines, and forwards records through a bounded channel;
//! [`HttpEventStream::next_event`] blocks on that channel.
//!
//! ```text
//!   reqwest body ──► pump task ──► mpsc(64) ──► next_event() (reader thread)
//!                        ▲
//!                  CloseHandle (any thread)
//! ```

use std::fs;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::TraceKind;
use crate::api::stream::{CloseHandle, EventStream, StreamError, TraceRecord};
use crate::core::config::ResolvedConfig;
use crate::core::event::LogEvent;

const RECORD_BUFFER: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body the server sends with non-2xx responses.
#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct KesClient {
    endpoint: String,
    client: reqwest::Client,
}

impl KesClient {
    /// Builds a client for the configured endpoint.
    ///
    /// When both a client certificate and key are configured they are
    /// presented as the TLS client identity. `insecure` disables server
    /// certificate verification.
    pub fn new(config: &ResolvedConfig) -> Result<Self, StreamError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure);

        match (&config.client_cert, &config.client_key) {
            (Some(cert), Some(key)) => {
                let mut pem = fs::read(cert).map_err(|e| {
                    StreamError::Identity(format!("cannot read {}: {e}", cert.display()))
                })?;
                pem.push(b'\n');
                pem.extend(fs::read(key).map_err(|e| {
                    StreamError::Identity(format!("cannot read {}: {e}", key.display()))
                })?);
                let identity = reqwest::Identity::from_pem(&pem)
                    .map_err(|e| StreamError::Identity(e.to_string()))?;
                builder = builder.identity(identity);
                info!("Using client certificate {}", cert.display());
            }
            (None, None) => debug!("No client certificate configured"),
            _ => warn!("Client certificate and key must both be set; ignoring the one given"),
        }

        if config.insecure {
            warn!("TLS certificate verification disabled");
        }

        let client = builder
            .build()
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn trace_url(&self, kind: TraceKind) -> String {
        format!("{}/v1/log/{}/trace", self.endpoint, kind.as_str())
    }

    /// Subscribes to the given log and returns its event stream.
    ///
    /// Must be called from within a tokio runtime; the returned stream
    /// owns a task on it.
    pub async fn trace(&self, kind: TraceKind) -> Result<HttpEventStream, StreamError> {
        let url = self.trace_url(kind);
        info!("Subscribing to {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        debug!("Trace response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            warn!("Trace subscription rejected: {} - {}", status, message);
            return Err(StreamError::Api { status, message });
        }

        Ok(HttpEventStream::spawn(response, kind))
    }
}

/// A live trace stream backed by an HTTP response body.
pub struct HttpEventStream {
    records: mpsc::Receiver<Result<TraceRecord, StreamError>>,
    err: Option<StreamError>,
    closer: CloseHandle,
}

impl HttpEventStream {
    fn spawn(response: reqwest::Response, kind: TraceKind) -> Self {
        let (tx, records) = mpsc::channel(RECORD_BUFFER);
        let closer = CloseHandle::new();
        tokio::spawn(pump(response, kind, tx, closer.clone()));
        Self {
            records,
            err: None,
            closer,
        }
    }
}

impl EventStream for HttpEventStream {
    fn next_event(&mut self) -> Option<TraceRecord> {
        if self.err.is_some() || self.closer.is_closed() {
            return None;
        }
        match self.records.blocking_recv() {
            Some(Ok(record)) if !self.closer.is_closed() => Some(record),
            Some(Ok(_)) => None,
            Some(Err(e)) => {
                self.err = Some(e);
                None
            }
            None => None,
        }
    }

    fn err(&self) -> Option<&StreamError> {
        self.err.as_ref()
    }

    fn close_handle(&self) -> CloseHandle {
        self.closer.clone()
    }
}

impl Drop for HttpEventStream {
    fn drop(&mut self) {
        self.closer.close();
    }
}

/// Reads the response body until it ends, fails, or the stream is closed.
async fn pump(
    response: reqwest::Response,
    kind: TraceKind,
    tx: mpsc::Sender<Result<TraceRecord, StreamError>>,
    closer: CloseHandle,
) {
    let mut body = Box::pin(response.bytes_stream());
    let mut lines = LineDecoder::default();
    let mut forwarded = 0usize;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = closer.closed() => {
                debug!("Trace stream closed after {} records", forwarded);
                return;
            }
            chunk = body.next() => chunk,
        };

        let items: Vec<Result<TraceRecord, StreamError>> = match chunk {
            Some(Ok(bytes)) => lines.push(&bytes).into_iter().map(|l| decode(kind, l)).collect(),
            Some(Err(e)) => vec![Err(StreamError::Network(e.to_string()))],
            None => {
                let tail = lines.finish().map(|l| decode(kind, l));
                info!("Server ended trace stream after {} records", forwarded);
                if let Some(item) = tail {
                    let _ = forward(&tx, &closer, item).await;
                }
                return;
            }
        };

        for item in items {
            let failed = item.is_err();
            if !forward(&tx, &closer, item).await || failed {
                return;
            }
            forwarded += 1;
        }
    }
}

/// Sends one item unless the stream gets closed first. Returns `false` when
/// the item could not be delivered.
async fn forward(
    tx: &mpsc::Sender<Result<TraceRecord, StreamError>>,
    closer: &CloseHandle,
    item: Result<TraceRecord, StreamError>,
) -> bool {
    tokio::select! {
        biased;
        _ = closer.closed() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

fn decode(kind: TraceKind, line: Result<String, StreamError>) -> Result<TraceRecord, StreamError> {
    let raw = line?;
    let event = LogEvent::from_json(kind, &raw).map_err(|e| StreamError::Decode(e.to_string()))?;
    Ok(TraceRecord { raw, event })
}

/// Longest line accepted before the stream is treated as corrupt.
pub const MAX_LINE_LEN: usize = 1 << 20;

/// Splits a byte stream into lines. Blank lines are skipped and a trailing
/// `\r` is dropped.
pub struct LineDecoder {
    buffer: Vec<u8>,
    // Bytes of `buffer` already known to contain no newline.
    scanned: usize,
    limit: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_LEN)
    }
}

impl LineDecoder {
    /// A decoder that rejects unterminated lines longer than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            limit,
        }
    }

    /// Feeds bytes in and returns every line they completed.
    ///
    /// Once the unterminated remainder grows past the limit, a decode error
    /// is returned and the remainder is discarded.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String, StreamError>> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            if let Some(line) = to_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.limit {
            lines.push(Err(StreamError::Decode(format!(
                "line exceeds {} bytes without a newline",
                self.limit
            ))));
            self.buffer.clear();
            self.scanned = 0;
        }
        lines
    }

    /// Returns whatever is left once the input has ended.
    pub fn finish(&mut self) -> Option<Result<String, StreamError>> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        to_line(&rest)
    }
}

fn to_line(bytes: &[u8]) -> Option<Result<String, StreamError>> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StreamError::Decode(format!("invalid UTF-8: {e}"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ok_lines(lines: Vec<Result<String, StreamError>>) -> Vec<String> {
        lines.into_iter().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn decoder_splits_complete_lines() {
        let mut decoder = LineDecoder::default();
        assert_eq!(ok_lines(decoder.push(b"{\"a\":1}\n{\"b\":2}\n")), ["{\"a\":1}", "{\"b\":2}"]);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_joins_lines_across_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(b"{\"mess").is_empty());
        assert!(decoder.push(b"age\":\"x\"}").is_empty());
        assert_eq!(ok_lines(decoder.push(b"\r\n")), ["{\"message\":\"x\"}"]);
    }

    #[test]
    fn decoder_skips_blank_lines() {
        let mut decoder = LineDecoder::default();
        assert_eq!(ok_lines(decoder.push(b"\n\r\n  \nx\n")), ["x"]);
    }

    #[test]
    fn decoder_returns_trailing_partial_line() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"a\nb");
        assert_eq!(decoder.finish().unwrap().unwrap(), "b");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decoder_rejects_invalid_utf8() {
        let mut decoder = LineDecoder::default();
        let lines = decoder.push(b"\xff\xfe\n");
        assert!(matches!(lines.as_slice(), [Err(StreamError::Decode(_))]));
    }

    #[test]
    fn decoder_resumes_scanning_after_partial_chunks() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(b"abc").is_empty());
        assert!(decoder.push(b"def").is_empty());
        assert_eq!(ok_lines(decoder.push(b"ghi\nj")), ["abcdefghi"]);
        assert_eq!(ok_lines(decoder.push(b"k\n")), ["jk"]);
    }

    #[test]
    fn decoder_accepts_line_at_the_limit() {
        let mut decoder = LineDecoder::with_limit(8);
        assert!(decoder.push(b"01234567").is_empty());
        assert_eq!(ok_lines(decoder.push(b"\n")), ["01234567"]);
    }

    #[test]
    fn decoder_rejects_overlong_unterminated_line() {
        let mut decoder = LineDecoder::with_limit(8);
        assert!(decoder.push(b"01234").is_empty());
        let lines = decoder.push(b"56789");
        assert!(
            matches!(lines.as_slice(), [Err(StreamError::Decode(msg))] if msg.contains("8 bytes")),
            "{lines:?}"
        );
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn decode_keeps_raw_line() {
        let raw = r#"{"message":"boom"}"#.to_string();
        let record = decode(TraceKind::Error, Ok(raw.clone())).unwrap();
        assert_eq!(record.raw, raw);
    }

    #[test]
    fn trace_url_strips_trailing_slash() {
        let config = crate::core::config::resolve_with_env(
            &Default::default(),
            &crate::core::config::CliOverrides {
                endpoint: Some("https://kes:7373/".to_string()),
                insecure: false,
            },
            |_| None,
        );
        let client = KesClient::new(&config).unwrap();
        assert_eq!(client.trace_url(TraceKind::Error), "https://kes:7373/v1/log/error/trace");
        assert_eq!(client.trace_url(TraceKind::Audit), "https://kes:7373/v1/log/audit/trace");
    }

    // ==========================================================================
    // Client identity
    // ==========================================================================

    fn config_with_identity(cert: Option<PathBuf>, key: Option<PathBuf>) -> ResolvedConfig {
        let mut config = crate::core::config::resolve_with_env(
            &Default::default(),
            &Default::default(),
            |_| None,
        );
        config.client_cert = cert;
        config.client_key = key;
        config
    }

    /// Writes `contents` to a file unique to this test process.
    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("kestrace-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_certificate_file_is_identity_error() {
        let key = temp_file("missing-cert.key", "unused");
        let cert = PathBuf::from("/nonexistent/client.crt");
        let config = config_with_identity(Some(cert), Some(key));
        match KesClient::new(&config) {
            Err(StreamError::Identity(msg)) => {
                assert!(msg.starts_with("cannot read /nonexistent/client.crt"), "{msg}");
            }
            Err(e) => panic!("expected identity error, got {e}"),
            Ok(_) => panic!("expected identity error"),
        }
    }

    #[test]
    fn missing_key_file_is_identity_error() {
        let cert = temp_file("missing-key.crt", "unused");
        let key = PathBuf::from("/nonexistent/client.key");
        let config = config_with_identity(Some(cert), Some(key));
        assert!(matches!(
            KesClient::new(&config),
            Err(StreamError::Identity(msg)) if msg.contains("/nonexistent/client.key")
        ));
    }

    #[test]
    fn garbage_pem_is_identity_error() {
        let cert = temp_file("garbage.crt", "not a certificate");
        let key = temp_file("garbage.key", "not a key either");
        let config = config_with_identity(Some(cert), Some(key));
        assert!(matches!(KesClient::new(&config), Err(StreamError::Identity(_))));
    }

    #[test]
    fn half_configured_identity_still_builds() {
        let cert = temp_file("half.crt", "unused");
        let config = config_with_identity(Some(cert.clone()), None);
        assert!(KesClient::new(&config).is_ok());

        let config = config_with_identity(None, Some(cert));
        assert!(KesClient::new(&config).is_ok());
    }
}
