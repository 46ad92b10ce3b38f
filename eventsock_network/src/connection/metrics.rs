//! Connection metrics
//!
//! Counters updated by the lifecycle manager as completions are handled.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct ConnectionMetrics {
    /// Connections accepted and not yet closed
    current_connections: AtomicUsize,
    /// Connections accepted since construction
    total_connections: AtomicU64,
    total_bytes_received: AtomicU64,
    total_bytes_sent: AtomicU64,
    reads_completed: AtomicU64,
    sends_completed: AtomicU64,
    closes: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self {
            current_connections: AtomicUsize::new(0),
            total_connections: AtomicU64::new(0),
            total_bytes_received: AtomicU64::new(0),
            total_bytes_sent: AtomicU64::new(0),
            reads_completed: AtomicU64::new(0),
            sends_completed: AtomicU64::new(0),
            closes: AtomicU64::new(0),
        }
    }

    pub fn record_accept(&self) {
        self.current_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a CLOSE_HANDLE; `accepted` is false for the datagram socket,
    /// which was never counted as a connection.
    pub fn record_close(&self, accepted: bool) {
        self.closes.fetch_add(1, Ordering::Relaxed);
        if accepted {
            // Saturate rather than wrap if a close is ever reported twice.
            let _ = self
                .current_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        }
    }

    pub fn record_read(&self, bytes: usize) {
        self.reads_completed.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_send(&self, bytes: usize) {
        self.sends_completed.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn current_connections(&self) -> usize {
        self.current_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn total_bytes_received(&self) -> u64 {
        self.total_bytes_received.load(Ordering::Relaxed)
    }

    pub fn total_bytes_sent(&self) -> u64 {
        self.total_bytes_sent.load(Ordering::Relaxed)
    }

    pub fn reads_completed(&self) -> u64 {
        self.reads_completed.load(Ordering::Relaxed)
    }

    pub fn sends_completed(&self) -> u64 {
        self.sends_completed.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> String {
        format!(
            "connection metrics:\n\
             - current connections: {}\n\
             - total connections: {}\n\
             - bytes received: {}\n\
             - bytes sent: {}\n\
             - reads completed: {}\n\
             - sends completed: {}\n\
             - closes: {}",
            self.current_connections(),
            self.total_connections(),
            self.total_bytes_received(),
            self.total_bytes_sent(),
            self.reads_completed(),
            self.sends_completed(),
            self.closes()
        )
    }
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
