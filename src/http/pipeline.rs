//! File streaming state machine.
//!
//! A [`FilePipeline`] opens one file and copies it to a sink one chunk at a
//! time. Reads and writes strictly alternate and share the caller's buffer:
//!
//! ```text
//!   Opening ──ok──▶ [Preamble] ──▶ Reading ──n > 0──▶ Writing(n)
//!      │                │             ▲  │                │
//!      │                │             │  └──────ok────────┘
//!      │                │             │
//!      └─────err────────┴──err──▶  Closed ◀── EOF / err ──┘
//! ```
//!
//! The file handle is released exactly once, on whichever transition reaches
//! `Closed`, or when the pipeline is dropped before getting there.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::ServeError;
use crate::stats::ResourceStats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Opening,
    Preamble,
    Reading,
    Writing(usize),
    Closed,
}

pub struct FilePipeline {
    path: PathBuf,
    state: PipelineState,
    file: Option<File>,
    preamble: Option<Bytes>,
    /// Bytes of file content written to the sink so far.
    offset: u64,
    stats: Arc<ResourceStats>,
}

impl FilePipeline {
    pub fn new(path: impl Into<PathBuf>, stats: Arc<ResourceStats>) -> Self {
        Self {
            path: path.into(),
            state: PipelineState::Opening,
            file: None,
            preamble: None,
            offset: 0,
            stats,
        }
    }

    /// Bytes written to the sink once the file is open, before any content.
    /// Nothing is written if the open fails.
    pub fn with_preamble(mut self, preamble: Bytes) -> Self {
        self.preamble = Some(preamble);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == PipelineState::Closed
    }

    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    /// Drives the pipeline to `Closed` and returns the number of file bytes
    /// written. On error the file has already been released.
    pub async fn run<W>(&mut self, sink: &mut W, buffer: &mut [u8]) -> Result<u64, ServeError>
    where
        W: AsyncWrite + Unpin,
    {
        while !self.is_closed() {
            self.step(sink, buffer).await?;
        }
        Ok(self.offset)
    }

    /// Performs exactly one transition.
    ///
    /// `buffer` must be the same slice on every call: a `Writing(n)` state
    /// refers to the first `n` bytes left there by the preceding read.
    pub async fn step<W>(&mut self, sink: &mut W, buffer: &mut [u8]) -> Result<(), ServeError>
    where
        W: AsyncWrite + Unpin,
    {
        match std::mem::replace(&mut self.state, PipelineState::Closed) {
            PipelineState::Opening => {
                let file = File::open(&self.path).await.map_err(|source| ServeError::Open {
                    path: self.path.clone(),
                    source,
                })?;
                self.stats.file_opened();
                self.file = Some(file);
                debug!(path = %self.path.display(), "File opened");

                self.state = if self.preamble.is_some() {
                    PipelineState::Preamble
                } else {
                    PipelineState::Reading
                };
            }

            PipelineState::Preamble => {
                if let Some(preamble) = self.preamble.take() {
                    if let Err(e) = sink.write_all(&preamble).await {
                        self.close();
                        return Err(ServeError::Write(e));
                    }
                }
                self.state = PipelineState::Reading;
            }

            PipelineState::Reading => {
                let Some(file) = self.file.as_mut() else {
                    return Ok(());
                };

                match file.read(buffer).await {
                    Ok(0) => {
                        trace!(path = %self.path.display(), bytes = self.offset, "End of file");
                        let flushed = sink.flush().await;
                        self.close();
                        flushed.map_err(ServeError::Write)?;
                    }
                    Ok(n) => {
                        self.state = PipelineState::Writing(n);
                    }
                    Err(source) => {
                        self.close();
                        return Err(ServeError::FileRead {
                            path: self.path.clone(),
                            offset: self.offset,
                            source,
                        });
                    }
                }
            }

            PipelineState::Writing(n) => {
                if let Err(e) = sink.write_all(&buffer[..n]).await {
                    self.close();
                    return Err(ServeError::Write(e));
                }
                trace!(path = %self.path.display(), bytes = n, "Chunk written");
                self.offset += n as u64;
                self.stats.bytes_sent(n);
                self.state = PipelineState::Reading;
            }

            PipelineState::Closed => {}
        }

        Ok(())
    }

    /// Releases the file handle, if one is held, and enters `Closed`.
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            self.stats.file_closed();
            debug!(path = %self.path.display(), "File closed");
        }
        self.state = PipelineState::Closed;
    }
}

impl Drop for FilePipeline {
    fn drop(&mut self) {
        self.close();
    }
}
