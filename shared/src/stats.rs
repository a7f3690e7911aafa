//! Forwarding statistics shared by the two relay loops.
//!
//! Each loop only ever increments counters, so plain relaxed atomics are
//! enough; a [`ForwardingStats`] snapshot may mix values from slightly
//! different instants.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Statistics about the data forwarding operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForwardingStats {
    /// Total bytes read from the serial line
    pub serial_bytes_read: u64,
    /// Total bytes written to the serial line
    pub serial_bytes_written: u64,
    /// Number of serial writes (one per relayed datagram)
    pub serial_writes: u64,
    /// Number of datagrams received from UDP
    pub datagrams_received: u64,
    /// Number of datagrams sent over UDP
    pub datagrams_sent: u64,
    /// Total bytes sent over UDP
    pub udp_bytes_sent: u64,
    /// Complete records extracted from the serial stream
    pub records_framed: u64,
    /// Records used only to prime field positions
    pub records_primed: u64,
    /// Records dropped because no field changed
    pub records_unchanged: u64,
    /// Records dropped because the re-encoded vector would not fit a datagram
    pub records_oversized: u64,
    /// I/O shortfalls absorbed by the loops
    pub transient_errors: u64,
}

/// Live counters behind [`ForwardingStats`]
#[derive(Debug, Default)]
pub struct ForwardingCounters {
    serial_bytes_read: AtomicU64,
    serial_bytes_written: AtomicU64,
    serial_writes: AtomicU64,
    datagrams_received: AtomicU64,
    datagrams_sent: AtomicU64,
    udp_bytes_sent: AtomicU64,
    records_framed: AtomicU64,
    records_primed: AtomicU64,
    records_unchanged: AtomicU64,
    records_oversized: AtomicU64,
    transient_errors: AtomicU64,
}

impl ForwardingCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serial_read(&self, bytes: usize) {
        self.serial_bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn serial_written(&self, bytes: usize) {
        self.serial_writes.fetch_add(1, Ordering::Relaxed);
        self.serial_bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn datagram_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datagram_sent(&self, bytes: usize) {
        self.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.udp_bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn records_framed(&self, count: usize) {
        self.records_framed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn records_primed(&self, count: usize) {
        self.records_primed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self) {
        self.records_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.records_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transient_error(&self) {
        self.transient_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> ForwardingStats {
        ForwardingStats {
            serial_bytes_read: self.serial_bytes_read.load(Ordering::Relaxed),
            serial_bytes_written: self.serial_bytes_written.load(Ordering::Relaxed),
            serial_writes: self.serial_writes.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            udp_bytes_sent: self.udp_bytes_sent.load(Ordering::Relaxed),
            records_framed: self.records_framed.load(Ordering::Relaxed),
            records_primed: self.records_primed.load(Ordering::Relaxed),
            records_unchanged: self.records_unchanged.load(Ordering::Relaxed),
            records_oversized: self.records_oversized.load(Ordering::Relaxed),
            transient_errors: self.transient_errors.load(Ordering::Relaxed),
        }
    }
}
