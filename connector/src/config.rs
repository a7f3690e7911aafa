//! Validated connector configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use fg_shared::{ForwarderConfig, ForwarderMode};
use log::LevelFilter;
use thiserror::Error;

use crate::cli::Cli;

/// Option values that parse but make no sense
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the serial port name is empty")]
    EmptySerialPort,
    #[error("unrecognized value for the baud rate: {0}")]
    InvalidBaudRate(u32),
    #[error("unrecognized argument value for {option}: port 0")]
    InvalidUdpPort { option: &'static str },
    #[error("unrecognized argument value for --udp-out-ip: {0}")]
    InvalidIp(String),
}

/// Everything needed to create the connector's resources
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial port name (e.g. `COM19`, `/dev/ttyUSB0`)
    pub serial_port: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Address the UDP receiver binds to
    pub udp_listen: SocketAddr,
    /// FlightGear address the UDP sender connects to
    pub udp_destination: SocketAddr,
    /// Forwarding policy
    pub mode: ForwarderMode,
    /// Default log level
    pub log_level: LevelFilter,
    /// Relay loop tuning
    pub forwarder: ForwarderConfig,
}

impl TryFrom<Cli> for BridgeConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let serial_port = cli.com.trim().to_string();
        if serial_port.is_empty() {
            return Err(ConfigError::EmptySerialPort);
        }
        if cli.baud == 0 {
            return Err(ConfigError::InvalidBaudRate(cli.baud));
        }
        if cli.udp_in_port == 0 {
            return Err(ConfigError::InvalidUdpPort { option: "--udp-in-port" });
        }
        if cli.udp_out_port == 0 {
            return Err(ConfigError::InvalidUdpPort { option: "--udp-out-port" });
        }
        let out_ip: IpAddr = cli
            .udp_out_ip
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidIp(cli.udp_out_ip.clone()))?;

        Ok(Self {
            serial_port,
            baud_rate: cli.baud,
            udp_listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), cli.udp_in_port),
            udp_destination: SocketAddr::new(out_ip, cli.udp_out_port),
            mode: if cli.copypast {
                ForwarderMode::Basic
            } else {
                ForwarderMode::Smart
            },
            log_level: if cli.debug {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            forwarder: ForwarderConfig::default(),
        })
    }
}
