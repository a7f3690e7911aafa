//! # DataForwarder Trait & Endpoint Abstractions
//!
//! This module defines the contract shared by every forwarder and the traits
//! that abstract the four endpoints it relays between:
//!
//! - **Serial read half** and **serial write half** of the cockpit device
//! - **UDP receiver** (datagrams from FlightGear) and **UDP sender**
//!
//! Separate reader and writer traits keep the two relay loops independent:
//! each loop owns one reader and one writer and nothing else.

use core::future::Future;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::stats::ForwardingStats;

/// Errors that can occur during data forwarding operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderError {
    /// The underlying transport reached end of stream
    #[error("transport disconnected")]
    Disconnected,
    /// I/O error reported by the transport
    #[error("I/O error: {0:?}")]
    Io(io::ErrorKind),
    /// `start()` was called on a forwarder that is not idle
    #[error("forwarder was already started")]
    AlreadyStarted,
    /// `wait_for_stop()` was called before `start()`
    #[error("forwarder was never started")]
    NotStarted,
    /// A relay task panicked or was aborted
    #[error("relay task failed")]
    TaskFailed,
}

impl ForwarderError {
    /// Whether the error is a shortfall the relay loop should absorb and
    /// continue past, rather than a failure that ends the loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForwarderError::Io(
                io::ErrorKind::WouldBlock
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
            )
        )
    }
}

impl From<io::Error> for ForwarderError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => ForwarderError::Disconnected,
            kind => ForwarderError::Io(kind),
        }
    }
}

/// Result type alias for forwarder operations
pub type ForwarderResult<T> = Result<T, ForwarderError>;

/// Trait for reading data from an endpoint (serial read half or UDP socket)
pub trait EndpointReader: Send {
    /// Wait until data is available and read it into `buf`
    ///
    /// For a byte stream this returns at least one byte; for a datagram
    /// socket it returns exactly one datagram (possibly empty).
    fn read_into_slice(
        &mut self,
        buf: &mut [u8],
    ) -> impl Future<Output = ForwarderResult<usize>> + Send;

    /// Read whatever is already buffered, without waiting
    ///
    /// Best effort: may return fewer bytes than are buffered, and returns
    /// `Ok(0)` when nothing is ready. Datagram endpoints keep the default.
    fn drain_into_slice(
        &mut self,
        _buf: &mut [u8],
    ) -> impl Future<Output = ForwarderResult<usize>> + Send {
        async { Ok(0) }
    }

    /// Check if the endpoint is open
    fn is_connected(&self) -> bool;

    /// Get the maximum packet size for this endpoint
    fn max_packet_size(&self) -> usize;
}

/// Trait for writing data to an endpoint (serial write half or UDP socket)
pub trait EndpointWriter: Send {
    /// Write all of `data`
    ///
    /// A datagram endpoint sends `data` as a single datagram.
    fn write_from_slice(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = ForwarderResult<usize>> + Send;

    /// Flush any buffered data to the underlying transport
    fn flush(&mut self) -> impl Future<Output = ForwarderResult<()>> + Send {
        async { Ok(()) }
    }

    /// Check if the endpoint is open
    fn is_connected(&self) -> bool;
}

/// Lifecycle phase of a forwarder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderPhase {
    /// Constructed, loops not launched
    Idle,
    /// Both relay loops launched
    Running,
    /// Both relay loops joined
    Stopped,
}

/// Forwarding policy, selected once from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwarderMode {
    /// Byte-exact mirror in both directions
    Basic,
    /// Relay a record only when one of its fields changed
    #[default]
    Smart,
}

/// Main trait that abstracts the bidirectional relay between serial and UDP
///
/// # Architecture
///
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                        DataForwarder                          │
/// │                                                               │
/// │   Serial read half                          UDP sender        │
/// │   ┌─────────┐     ┌──────────────────┐      ┌─────────┐       │
/// │   │  Read   │────►│ serial_to_udp    │─────►│  Send   │       │
/// │   └─────────┘     │ (task)           │      └─────────┘       │
/// │                   └──────────────────┘                        │
/// │                                                               │
/// │   ┌─────────┐     ┌──────────────────┐      ┌─────────┐       │
/// │   │  Write  │◄────│ udp_to_serial    │◄─────│  Recv   │       │
/// │   └─────────┘     │ (task)           │      └─────────┘       │
/// │   Serial write half                         UDP receiver      │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// Both loops stop only through the shared [`ShutdownSignal`](crate::ShutdownSignal);
/// `wait_for_stop` never triggers it.
pub trait DataForwarder {
    /// Launch the two relay loops
    ///
    /// Fails with [`ForwarderError::AlreadyStarted`] on any call after the first.
    fn start(&mut self) -> ForwarderResult<()>;

    /// Wait until both relay loops have exited
    ///
    /// Returns the first fatal error reported by a loop, if any.
    fn wait_for_stop(&mut self) -> impl Future<Output = ForwarderResult<()>>;

    /// Current lifecycle phase
    fn phase(&self) -> ForwarderPhase;

    /// Get statistics about the forwarding operation
    fn stats(&self) -> ForwardingStats;
}

/// Tuning for the relay loops
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Largest number of buffered serial bytes drained in one pass
    pub serial_read_size: usize,
    /// Largest datagram sent to the simulator
    pub max_datagram_size: usize,
    /// How often a loop re-checks a serial port that reports closed
    pub closed_port_poll: std::time::Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            serial_read_size: 4096,
            max_datagram_size: crate::MAX_DATAGRAM_SIZE,
            closed_port_poll: std::time::Duration::from_millis(10),
        }
    }
}
