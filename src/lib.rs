//! chunkserve - single-threaded static file server
//!
//! Core library: request resolution, chunked file streaming and the listener.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod stats;
