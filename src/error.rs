//! Error taxonomy for the server.
//!
//! Every variant except [`ServeError::Bind`] is terminal for one connection
//! only; the listener keeps running.

use std::io;
use std::path::PathBuf;

use crate::http::parser::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The listening socket could not be created. Fatal.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("failed to read request: {0}")]
    RequestRead(#[source] io::Error),

    #[error("malformed request: {0}")]
    Malformed(#[from] ParseError),

    /// The first read filled the whole buffer; requests spanning more than one
    /// buffer are not reassembled.
    #[error("long message is not supported ({0} bytes filled the request buffer)")]
    LongMessage(usize),

    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {} at offset {offset}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to peer: {0}")]
    Write(#[source] io::Error),

    /// A connection reached a state its owned resources do not support.
    #[error("internal connection error: {0}")]
    Internal(&'static str),
}

impl ServeError {
    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServeError::Bind { .. } => "bind",
            ServeError::Accept(_) => "accept",
            ServeError::RequestRead(_) => "request_read",
            ServeError::Malformed(_) => "malformed",
            ServeError::LongMessage(_) => "long_message",
            ServeError::Open { .. } => "open",
            ServeError::FileRead { .. } => "file_read",
            ServeError::Write(_) => "write",
            ServeError::Internal(_) => "internal",
        }
    }
}
