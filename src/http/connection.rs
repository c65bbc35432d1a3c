use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::config::StaticFilesConfig;
use crate::error::ServeError;
use crate::http::pipeline::FilePipeline;
use crate::http::request::Request;
use crate::http::response::{StatusCode, response_head};
use crate::stats::ResourceStats;

/// One accepted client, from the first read to the final close.
///
/// The connection exclusively owns its socket, its transfer buffer and (via
/// the [`FilePipeline`]) its file handle. Each sits in an `Option` and is
/// released with `take()`, so no exit path can release it twice.
pub struct Connection<S> {
    socket: Option<S>,
    pipeline: Option<FilePipeline>,
    buffer: BytesMut,
    path: Option<PathBuf>,
    state: ConnectionState,
    config: StaticFilesConfig,
    stats: Arc<ResourceStats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequest,
    ResolvingPath(usize), // bytes of request in the buffer
    OpeningFile(PathBuf),
    Streaming,
    Closing,
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(socket: S, config: StaticFilesConfig, stats: Arc<ResourceStats>) -> Self {
        stats.socket_opened();
        Self {
            socket: Some(socket),
            pipeline: None,
            buffer: BytesMut::zeroed(config.buffer_size),
            path: None,
            state: ConnectionState::AwaitingRequest,
            config,
            stats,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// The resolved path, once the request has been parsed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Serves the connection and tears it down.
    ///
    /// Returns the number of file bytes delivered. Whatever the outcome, the
    /// connection is `Closed` with every resource released when this returns.
    pub async fn run(&mut self) -> Result<u64, ServeError> {
        let result = self.drive().await;
        self.close().await;
        result
    }

    async fn drive(&mut self) -> Result<u64, ServeError> {
        loop {
            if let Some(sent) = self.step().await? {
                return Ok(sent);
            }
        }
    }

    /// Performs one lifecycle transition.
    ///
    /// Returns `Some(bytes)` once nothing is left to do but close. An error
    /// leaves the state at `Closing`; `run` still has to be called to release
    /// the socket.
    pub async fn step(&mut self) -> Result<Option<u64>, ServeError> {
        match std::mem::replace(&mut self.state, ConnectionState::Closing) {
            ConnectionState::AwaitingRequest => {
                self.state = match self.read_request().await? {
                    Some(n) => ConnectionState::ResolvingPath(n),
                    None => ConnectionState::Closing,
                };
            }

            ConnectionState::ResolvingPath(n) => {
                let request = Request::resolve(&self.buffer[..n], &self.config)?;
                debug!(request_target = %request.target, path = %request.path.display(), "Request resolved");
                self.path = Some(request.path.clone());
                self.state = ConnectionState::OpeningFile(request.path);
            }

            ConnectionState::OpeningFile(path) => {
                let Some(socket) = self.socket.as_mut() else {
                    return Err(ServeError::Internal("socket released before the file was opened"));
                };
                let pipeline = self.pipeline.insert(
                    FilePipeline::new(path, self.stats.clone())
                        .with_preamble(response_head(StatusCode::Ok)),
                );
                // Opening writes nothing, so a failure leaves the socket untouched.
                pipeline.step(socket, &mut self.buffer).await?;
                self.state = ConnectionState::Streaming;
            }

            ConnectionState::Streaming => {
                let (Some(socket), Some(pipeline)) = (self.socket.as_mut(), self.pipeline.as_mut())
                else {
                    return Err(ServeError::Internal("streaming without a socket or an open file"));
                };
                return pipeline.run(socket, &mut self.buffer).await.map(Some);
            }

            ConnectionState::Closing | ConnectionState::Closed => return Ok(Some(0)),
        }

        Ok(None)
    }

    /// Reads the request with a single read.
    ///
    /// `Ok(None)` means the peer closed before sending anything. A read that
    /// fills the whole buffer is rejected rather than reassembled.
    async fn read_request(&mut self) -> Result<Option<usize>, ServeError> {
        let Some(socket) = self.socket.as_mut() else {
            return Ok(None);
        };

        let n = socket
            .read(&mut self.buffer)
            .await
            .map_err(ServeError::RequestRead)?;

        if n == 0 {
            trace!("Peer closed before sending a request");
            return Ok(None);
        }
        if n == self.buffer.len() {
            return Err(ServeError::LongMessage(n));
        }

        Ok(Some(n))
    }

    /// Releases the file, the socket and the buffer, each at most once.
    async fn close(&mut self) {
        self.state = ConnectionState::Closing;

        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.close();
        }

        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.shutdown().await {
                trace!(error = %e, "Socket shutdown failed");
            }
            drop(socket);
            self.stats.socket_closed();
        }

        self.buffer = BytesMut::new();
        self.state = ConnectionState::Closed;
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        // Only reached with a live socket if the task was cancelled mid-run.
        if self.socket.take().is_some() {
            self.stats.socket_closed();
        }
    }
}
