use std::time::Duration;

use kestrace::TraceKind;
use kestrace::api::{EventStream, HttpEventStream, KesClient, StreamError, TraceRecord};
use kestrace::core::config::{CliOverrides, TraceConfig, resolve_with_env};
use kestrace::core::event::LogEvent;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

/// A client pointed at `endpoint` with no identity and no env overrides.
fn client_for(endpoint: String) -> KesClient {
    let cli = CliOverrides {
        endpoint: Some(endpoint),
        insecure: false,
    };
    let config = resolve_with_env(&TraceConfig::default(), &cli, |_| None);
    KesClient::new(&config).unwrap()
}

/// Reads the stream to its end on a blocking thread.
async fn collect(mut stream: HttpEventStream) -> (Vec<TraceRecord>, Option<StreamError>) {
    tokio::task::spawn_blocking(move || {
        let mut records = Vec::new();
        while let Some(record) = stream.next_event() {
            records.push(record);
        }
        (records, stream.err().cloned())
    })
    .await
    .unwrap()
}

const AUDIT_LINE: &str = r#"{"time":"2024-03-01T10:02:03Z","request":{"path":"/v1/key/create/my-key","identity":"3ecfcdf3"},"response":{"code":200,"time":1500000}}"#;
const AUDIT_LINE_404: &str = r#"{"time":"2024-03-01T10:02:04Z","request":{"path":"/v1/key/delete/other","identity":"3ecfcdf3"},"response":{"code":404,"time":1234000000}}"#;

// ============================================================================
// Streaming Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_audit_stream_decodes_every_line_then_ends_cleanly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/log/audit/trace"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("{AUDIT_LINE}\n{AUDIT_LINE_404}\n")),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(mock_server.uri());
    let stream = client.trace(TraceKind::Audit).await.unwrap();
    let (records, err) = collect(stream).await;

    assert_eq!(err, None);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].raw, AUDIT_LINE);
    let LogEvent::Audit(second) = &records[1].event else {
        panic!("expected audit event");
    };
    assert_eq!(second.request.path, "/v1/key/delete/other");
    assert_eq!(second.response.status_code, 404);
    assert_eq!(second.response.duration, Duration::from_millis(1234));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_stream_without_trailing_newline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/log/error/trace"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"message\":\"2024/03/01 10:02:03 disk full\"}\n\n{\"message\":\"last\"}",
        ))
        .mount(&mock_server)
        .await;

    let client = client_for(mock_server.uri());
    let (records, err) = collect(client.trace(TraceKind::Error).await.unwrap()).await;

    assert_eq!(err, None);
    let messages: Vec<String> = records
        .into_iter()
        .map(|r| match r.event {
            LogEvent::Error(e) => e.message,
            LogEvent::Audit(_) => panic!("expected error event"),
        })
        .collect();
    assert_eq!(messages, ["2024/03/01 10:02:03 disk full", "last"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_line_ends_stream_with_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/log/error/trace"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"message\":\"ok\"}\nnot json\n{\"message\":\"never\"}\n"),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(mock_server.uri());
    let (records, err) = collect(client.trace(TraceKind::Error).await.unwrap()).await;

    assert_eq!(records.len(), 1);
    assert!(matches!(err, Some(StreamError::Decode(_))), "got {err:?}");
}

// ============================================================================
// Subscription Errors
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_api_error_unwraps_json_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/log/audit/trace"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string(r#"{"message":"not authorized: insufficient permissions"}"#),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(mock_server.uri());
    let err = client.trace(TraceKind::Audit).await.err().unwrap();

    assert_eq!(
        err,
        StreamError::Api {
            status: 403,
            message: "not authorized: insufficient permissions".to_string(),
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_error_keeps_plain_text_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/log/error/trace"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let client = client_for(mock_server.uri());
    match client.trace(TraceKind::Error).await {
        Err(StreamError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal error");
        }
        other => panic!("expected API error, got {:?}", other.err()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_is_connect_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{addr}"));
    let err = client.trace(TraceKind::Audit).await.err().unwrap();
    assert!(matches!(err, StreamError::Connect(_)), "got {err:?}");
}

// ============================================================================
// Close
// ============================================================================

/// Serves one chunked response with a single line, then keeps the
/// connection open until the test ends.
async fn hold_open_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await.unwrap();

        let line = "{\"message\":\"first\"}\n";
        let response = format!(
            concat!(
                "HTTP/1.1 200 OK\r\n",
                "Content-Type: application/x-ndjson\r\n",
                "Transfer-Encoding: chunked\r\n\r\n",
                "{:x}\r\n{}\r\n",
            ),
            line.len(),
            line
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
    });
    format!("http://{addr}")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_close_unblocks_a_waiting_reader() {
    let client = client_for(hold_open_server().await);
    let mut stream = client.trace(TraceKind::Error).await.unwrap();
    let closer = stream.close_handle();

    let reader = tokio::task::spawn_blocking(move || {
        let first = stream.next_event();
        // Blocks until closed: the server never sends another line.
        let second = stream.next_event();
        (first, second, stream.err().cloned())
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let closer_thread = closer.clone();
    std::thread::spawn(move || closer_thread.close()).join().unwrap();

    let (first, second, err) = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("reader stayed blocked after close")
        .unwrap();

    assert_eq!(first.unwrap().raw, "{\"message\":\"first\"}");
    assert!(second.is_none());
    assert_eq!(err, None);
    assert!(closer.is_closed());
    assert!(!closer.close());
}
