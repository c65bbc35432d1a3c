//! Handle accounting shared by every connection.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for sockets and files currently held by the server.
///
/// Each connection and file pipeline reports its opens and closes here, so
/// once all connections have finished both `open_*` counters read zero.
#[derive(Debug, Default)]
pub struct ResourceStats {
    connections_accepted: AtomicU64,
    open_sockets: AtomicU64,
    open_files: AtomicU64,
    bytes_sent: AtomicU64,
}

impl ResourceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn socket_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.open_sockets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn socket_closed(&self) {
        self.open_sockets.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn file_opened(&self) {
        self.open_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn file_closed(&self) {
        self.open_files.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn bytes_sent(&self, count: usize) {
        self.bytes_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn connections_accepted(&self) -> u64 {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    pub fn open_sockets(&self) -> u64 {
        self.open_sockets.load(Ordering::Relaxed)
    }

    pub fn open_files(&self) -> u64 {
        self.open_files.load(Ordering::Relaxed)
    }

    pub fn total_bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
}
