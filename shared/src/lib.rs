//! # Shared Forwarding Library
//!
//! This crate provides the core of the FlightGear serial connector:
//!
//! - **Record Format**: newline-terminated, comma-separated snapshots
//! - **DataForwarder Trait**: contract for the bidirectional serial ⇄ UDP relay
//! - **Forwarders**: [`BasicForwarder`] (raw mirror) and [`SmartForwarder`]
//!   (differential, change-suppressed)
//!
//! ## Architecture
//!
//! ```text
//! Serial read half ──► RecordBuffer ──► from_serial diff ──► UDP sender
//!
//! Serial write half ◄────────────────── to_serial diff ◄──── UDP receiver
//! ```
//!
//! Each direction runs as its own tokio task and owns the state it mutates.
//! Both stop on the same [`ShutdownSignal`].

pub mod buffer;
pub mod forwarder;
pub mod protocol;
pub mod shutdown;
pub mod stats;
pub mod traits;
pub mod transport;

// Re-export main types for convenience
pub use buffer::RecordBuffer;
pub use forwarder::{BasicForwarder, Endpoints, Forwarder, SmartForwarder};
pub use protocol::{FieldVector, Record, FIELD_SEPARATOR, RECORD_TERMINATOR};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use stats::{ForwardingCounters, ForwardingStats};
pub use traits::{
    DataForwarder, EndpointReader, EndpointWriter, ForwarderConfig, ForwarderError, ForwarderMode,
    ForwarderPhase, ForwarderResult,
};
pub use transport::{StreamReader, StreamWriter, UdpReceiver, UdpSender};

/// Library version, logged at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
