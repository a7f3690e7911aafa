use fg_shared::ForwarderError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while setting up or running the connector
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not find a serial port with the name '{0}'")]
    SerialPortNotFound(String),
    #[error("failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("UDP setup failed for {addr}: {source}")]
    Udp {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("forwarder error: {0}")]
    Forwarder(#[from] ForwarderError),
}
