//! Connector lifecycle: create resources, forward until quit, release.

use std::io::BufRead;
use std::path::Path;

use fg_shared::shutdown::{self, ShutdownTrigger};
use fg_shared::{
    DataForwarder, Endpoints, Forwarder, ForwardingStats, StreamReader, StreamWriter, UdpReceiver,
    UdpSender,
};
use log::{debug, error, info, warn};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialPortInfo, SerialStream};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Line the operator types to stop the connector
pub const QUIT_COMMAND: &str = "quit";

type SerialForwarder = Forwarder<
    StreamReader<ReadHalf<SerialStream>>,
    StreamWriter<WriteHalf<SerialStream>>,
    UdpReceiver,
    UdpSender,
>;

/// A running connector: open port, bound sockets and a started forwarder
pub struct Bridge {
    forwarder: SerialForwarder,
    trigger: ShutdownTrigger,
}

impl Bridge {
    /// Create every resource and start forwarding
    ///
    /// Nothing is started unless all resources were created.
    pub async fn open(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let udp_receiver = UdpReceiver::bind(config.udp_listen)
            .await
            .map_err(|source| BridgeError::Udp {
                addr: config.udp_listen,
                source,
            })?;
        debug!("Listening for FlightGear on {}", config.udp_listen);

        let udp_sender = UdpSender::connect(config.udp_destination)
            .await
            .map_err(|source| BridgeError::Udp {
                addr: config.udp_destination,
                source,
            })?;
        debug!("Sending to FlightGear at {}", config.udp_destination);

        let listed = match tokio_serial::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Could not enumerate serial ports: {}", e);
                Vec::new()
            }
        };
        if !serial_port_exists(&config.serial_port, &listed) {
            return Err(BridgeError::SerialPortNotFound(config.serial_port.clone()));
        }

        let serial = tokio_serial::new(&config.serial_port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .open_native_async()
            .map_err(|source| BridgeError::SerialOpen {
                port: config.serial_port.clone(),
                source,
            })?;
        debug!(
            "Opened serial port {} at {} baud",
            config.serial_port, config.baud_rate
        );
        let (serial_rx, serial_tx) = tokio::io::split(serial);

        let (trigger, signal) = shutdown::channel();
        let endpoints = Endpoints {
            serial_reader: StreamReader::new(serial_rx),
            serial_writer: StreamWriter::new(serial_tx),
            udp_receiver,
            udp_sender,
        };
        let mut forwarder = Forwarder::new(config.mode, endpoints, signal, config.forwarder.clone());
        forwarder.start()?;
        info!("Forwarding in {:?} mode", forwarder.mode());

        Ok(Self { forwarder, trigger })
    }

    /// Block until the operator quits, then stop and release everything
    pub async fn run_until_quit(self) -> Result<ForwardingStats, BridgeError> {
        spawn_quit_watcher(self.trigger.clone());
        let signal = self.trigger.signal();

        tokio::select! {
            _ = signal.cancelled() => debug!("Quit requested"),
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Interrupted"),
                Err(e) => error!("Could not listen for Ctrl-C: {}", e),
            },
        }

        self.stop().await
    }

    /// Cancel both loops, wait for them and return the final counters
    pub async fn stop(mut self) -> Result<ForwardingStats, BridgeError> {
        self.trigger.cancel();
        let result = self.forwarder.wait_for_stop().await;
        let stats = self.forwarder.stats();
        match serde_json::to_string(&stats) {
            Ok(json) => info!("Forwarding stats: {}", json),
            Err(e) => warn!("Could not serialize stats: {}", e),
        }
        result?;
        Ok(stats)
    }
}

/// Whether `name` refers to a serial port on this machine
///
/// Enumeration misses some devices (pseudo terminals, symlinks under
/// `/dev/serial/by-id`), so an existing device path is accepted too.
pub fn serial_port_exists(name: &str, listed: &[SerialPortInfo]) -> bool {
    listed.iter().any(|port| port.port_name == name) || Path::new(name).exists()
}

/// Read stdin lines on a plain thread and cancel on `quit`
///
/// Blocking stdin reads cannot be cancelled, so the thread is detached and
/// dies with the process.
fn spawn_quit_watcher(trigger: ShutdownTrigger) {
    let spawned = std::thread::Builder::new()
        .name("quit-watcher".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if is_quit(&line) => {
                        trigger.cancel();
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Could not read stdin: {}", e);
                        return;
                    }
                }
            }
            // stdin closed: only Ctrl-C can stop us now
            debug!("stdin closed");
        });
    if let Err(e) = spawned {
        warn!("Could not start quit watcher: {}", e);
    }
}

fn is_quit(line: &str) -> bool {
    line.trim() == QUIT_COMMAND
}
