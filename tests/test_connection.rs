//! Tests for the per-connection state machine over an in-memory socket

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use chunkserve::config::StaticFilesConfig;
use chunkserve::error::ServeError;
use chunkserve::http::connection::{Connection, ConnectionState};
use chunkserve::stats::ResourceStats;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

const HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

/// Socket whose reads fail as if the peer reset the connection. Counts the
/// bytes the server tries to write.
struct ResetSocket {
    written: Arc<AtomicUsize>,
}

impl AsyncRead for ResetSocket {
    fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
    }
}

impl AsyncWrite for ResetSocket {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.written.fetch_add(buf.len(), Ordering::Relaxed);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn static_config(root: &Path, buffer_size: usize) -> StaticFilesConfig {
    StaticFilesConfig {
        root: root.to_str().unwrap().to_string(),
        buffer_size,
        ..StaticFilesConfig::default()
    }
}

/// Sends `request` (or just half-closes when it is empty), runs the
/// connection to completion and returns everything the client received.
async fn exchange(
    cfg: StaticFilesConfig,
    stats: Arc<ResourceStats>,
    request: &[u8],
) -> (Vec<u8>, Result<u64, ServeError>) {
    let (mut client, server): (DuplexStream, DuplexStream) = tokio::io::duplex(64 * 1024);
    let mut conn = Connection::new(server, cfg, stats);

    if request.is_empty() {
        client.shutdown().await.unwrap();
    } else {
        client.write_all(request).await.unwrap();
    }

    let (result, response) = tokio::join!(conn.run(), async {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        out
    });

    assert_eq!(conn.state(), &ConnectionState::Closed);
    (response, result)
}

fn docroot() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), b"<h1>hi</h1>").unwrap();
    dir
}

#[tokio::test]
async fn test_index_served_with_status_line() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());

    let (response, result) = exchange(
        static_config(dir.path(), 1024),
        stats.clone(),
        b"GET / HTTP/1.1\r\n\r\n",
    )
    .await;

    assert_eq!(result.unwrap(), 11);
    assert_eq!(response, b"HTTP/1.1 200 OK\r\n\r\n<h1>hi</h1>");
    assert_eq!(stats.open_sockets(), 0);
    assert_eq!(stats.open_files(), 0);
}

#[tokio::test]
async fn test_missing_file_closes_without_bytes() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());

    let (response, result) = exchange(
        static_config(dir.path(), 1024),
        stats.clone(),
        b"GET /missing.txt HTTP/1.1\r\n\r\n",
    )
    .await;

    assert!(matches!(result, Err(ServeError::Open { .. })));
    assert!(response.is_empty());
    assert_eq!(stats.open_sockets(), 0);
}

#[tokio::test]
async fn test_large_file_spans_many_chunks() {
    let dir = docroot();
    let content: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 256) as u8).collect();
    std::fs::write(dir.path().join("big.bin"), &content).unwrap();

    let (response, result) = exchange(
        static_config(dir.path(), 1024),
        Arc::new(ResourceStats::new()),
        b"GET /big.bin HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;

    assert_eq!(result.unwrap(), 50_000);
    assert_eq!(&response[..HEAD.len()], HEAD);
    assert_eq!(&response[HEAD.len()..], &content[..]);
}

#[tokio::test]
async fn test_request_filling_buffer_is_rejected() {
    let dir = docroot();
    let mut request = b"GET / HTTP/1.1\r\n".to_vec();
    request.resize(64, b'x');

    let (response, result) = exchange(
        static_config(dir.path(), 64),
        Arc::new(ResourceStats::new()),
        &request,
    )
    .await;

    assert!(matches!(result, Err(ServeError::LongMessage(64))));
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_request_one_byte_short_of_buffer_is_served() {
    let dir = docroot();
    let mut request = b"GET / HTTP/1.1\r\n".to_vec();
    request.resize(63, b'x');

    let (response, result) = exchange(
        static_config(dir.path(), 64),
        Arc::new(ResourceStats::new()),
        &request,
    )
    .await;

    assert_eq!(result.unwrap(), 11);
    assert!(response.starts_with(HEAD));
}

#[tokio::test]
async fn test_malformed_request_closes_without_bytes() {
    let dir = docroot();

    for request in [
        &b"POST / HTTP/1.1\r\n\r\n"[..],
        &b"GET / HTTP/1.0\r\n\r\n"[..],
        &b"hello"[..],
    ] {
        let (response, result) = exchange(
            static_config(dir.path(), 1024),
            Arc::new(ResourceStats::new()),
            request,
        )
        .await;

        assert!(matches!(result, Err(ServeError::Malformed(_))));
        assert!(response.is_empty());
    }
}

#[tokio::test]
async fn test_immediate_eof_closes_silently() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());

    let (response, result) = exchange(static_config(dir.path(), 1024), stats.clone(), b"").await;

    assert_eq!(result.unwrap(), 0);
    assert!(response.is_empty());
    assert_eq!(stats.open_sockets(), 0);
}

#[tokio::test]
async fn test_directory_read_error_after_head() {
    let dir = docroot();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let stats = Arc::new(ResourceStats::new());

    let (response, result) = exchange(
        static_config(dir.path(), 1024),
        stats.clone(),
        b"GET /sub HTTP/1.1\r\n\r\n",
    )
    .await;

    assert!(matches!(result, Err(ServeError::FileRead { .. })));
    assert_eq!(response, HEAD);
    assert_eq!(stats.open_files(), 0);
    assert_eq!(stats.open_sockets(), 0);
}

#[tokio::test]
async fn test_subdirectory_index_fallback() {
    let dir = docroot();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("index.html"), b"docs").unwrap();

    let (response, result) = exchange(
        static_config(dir.path(), 1024),
        Arc::new(ResourceStats::new()),
        b"GET /docs/ HTTP/1.1\r\n\r\n",
    )
    .await;

    assert_eq!(result.unwrap(), 4);
    assert_eq!(response, b"HTTP/1.1 200 OK\r\n\r\ndocs");
}

#[tokio::test]
async fn test_resource_accounting_after_mixed_outcomes() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());
    let requests: [&[u8]; 5] = [
        b"GET / HTTP/1.1\r\n\r\n",
        b"GET /missing.txt HTTP/1.1\r\n\r\n",
        b"DELETE / HTTP/1.1\r\n\r\n",
        b"",
        b"GET /index.html HTTP/1.1\r\n\r\n",
    ];

    for request in requests {
        let _ = exchange(static_config(dir.path(), 1024), stats.clone(), request).await;
    }

    assert_eq!(stats.connections_accepted(), 5);
    assert_eq!(stats.open_sockets(), 0);
    assert_eq!(stats.open_files(), 0);
    assert_eq!(stats.total_bytes_sent(), 22);
}

#[tokio::test]
async fn test_dropped_connection_releases_socket() {
    let stats = Arc::new(ResourceStats::new());
    let (_client, server) = tokio::io::duplex(1024);

    let conn = Connection::new(server, StaticFilesConfig::default(), stats.clone());
    assert_eq!(conn.state(), &ConnectionState::AwaitingRequest);
    assert_eq!(stats.open_sockets(), 1);

    drop(conn);
    assert_eq!(stats.open_sockets(), 0);
}

#[tokio::test]
async fn test_resolved_path_is_recorded() {
    let dir = docroot();
    let (mut client, server) = tokio::io::duplex(4096);
    let mut conn = Connection::new(
        server,
        static_config(dir.path(), 1024),
        Arc::new(ResourceStats::new()),
    );
    assert!(conn.path().is_none());

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let (result, _) = tokio::join!(conn.run(), async {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
    });

    result.unwrap();
    assert_eq!(conn.path(), Some(dir.path().join("index.html").as_path()));
}

#[tokio::test]
async fn test_request_read_error_closes_without_bytes() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());
    let written = Arc::new(AtomicUsize::new(0));
    let socket = ResetSocket {
        written: written.clone(),
    };
    let mut conn = Connection::new(socket, static_config(dir.path(), 1024), stats.clone());

    let result = conn.run().await;

    assert!(matches!(result, Err(ServeError::RequestRead(_))));
    assert_eq!(conn.state(), &ConnectionState::Closed);
    assert_eq!(stats.open_sockets(), 0);
    assert_eq!(stats.open_files(), 0);
    assert_eq!(written.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_file_is_opened_in_opening_state() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());
    let (mut client, server) = tokio::io::duplex(4096);
    let mut conn = Connection::new(server, static_config(dir.path(), 1024), stats.clone());
    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

    assert_eq!(conn.step().await.unwrap(), None);
    assert!(matches!(conn.state(), ConnectionState::ResolvingPath(_)));
    assert_eq!(conn.step().await.unwrap(), None);
    assert!(matches!(conn.state(), ConnectionState::OpeningFile(_)));
    assert_eq!(stats.open_files(), 0);

    assert_eq!(conn.step().await.unwrap(), None);
    assert_eq!(conn.state(), &ConnectionState::Streaming);
    assert_eq!(stats.open_files(), 1);

    let (result, response) = tokio::join!(conn.run(), async {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        out
    });
    assert_eq!(result.unwrap(), 11);
    assert_eq!(response, b"HTTP/1.1 200 OK\r\n\r\n<h1>hi</h1>");
    assert_eq!(stats.open_files(), 0);
}

#[tokio::test]
async fn test_open_failure_reported_before_streaming() {
    let dir = docroot();
    let stats = Arc::new(ResourceStats::new());
    let (mut client, server) = tokio::io::duplex(4096);
    let mut conn = Connection::new(server, static_config(dir.path(), 1024), stats.clone());
    client.write_all(b"GET /missing.txt HTTP/1.1\r\n\r\n").await.unwrap();

    conn.step().await.unwrap();
    conn.step().await.unwrap();
    assert!(matches!(conn.state(), ConnectionState::OpeningFile(_)));

    let err = conn.step().await.unwrap_err();
    assert!(matches!(err, ServeError::Open { .. }));
    assert_eq!(conn.state(), &ConnectionState::Closing);

    assert_eq!(conn.run().await.unwrap(), 0);
    assert_eq!(conn.state(), &ConnectionState::Closed);
    assert_eq!(stats.open_sockets(), 0);

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert!(response.is_empty());
}
