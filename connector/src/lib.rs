//! # FlightGear Serial Connector
//!
//! Relays FlightGear generic-protocol traffic between a serial cockpit device
//! and the simulator's UDP input/output channels.
//!
//! ```text
//!  cockpit device ── serial ──►  [ forwarder ]  ── UDP out ──► FlightGear
//!                  ◄── serial ──  [           ]  ◄── UDP in ───
//! ```
//!
//! - [`cli`]: command line options
//! - [`config`]: option validation
//! - [`app`]: resource lifecycle and the quit prompt
//! - [`error`]: connector errors

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::Bridge;
pub use cli::Cli;
pub use config::{BridgeConfig, ConfigError};
pub use error::BridgeError;
