//! HTTP protocol implementation.
//!
//! This module implements the minimal HTTP/1.1 subset the server speaks: one
//! `GET <path> HTTP/1.1` request per connection, answered with a bare
//! `HTTP/1.1 200 OK` status line and the raw file bytes.
//!
//! # Architecture
//!
//! - **`connection`**: per-client state machine and teardown
//! - **`parser`**: extracts the target from the request line
//! - **`request`**: maps the target onto the document root
//! - **`pipeline`**: streams a file to a sink in bounded chunks
//! - **`response`**: status codes and the response head
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← single read into the transfer buffer
//!        └──────┬───────────┘
//!               │ n bytes, 0 < n < capacity
//!               ▼
//!        ┌──────────────────┐
//!        │  ResolvingPath   │ ← parse request line, apply index rule
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   OpeningFile    │ ← open the file, nothing written yet
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │    Streaming     │ ← read chunk ⇄ write chunk until EOF
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │ Closing → Closed │ ← reached from every state, on any error
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chunkserve::config::StaticFilesConfig;
//! use chunkserve::http::connection::Connection;
//! use chunkserve::stats::ResourceStats;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let stats = Arc::new(ResourceStats::new());
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let mut conn = Connection::new(socket, StaticFilesConfig::default(), stats.clone());
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod parser;
pub mod pipeline;
pub mod request;
pub mod response;
