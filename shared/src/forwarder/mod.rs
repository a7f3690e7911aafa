//! # Forwarders
//!
//! Two policies implement [`DataForwarder`]:
//!
//! - [`BasicForwarder`]: byte-exact mirror in both directions
//! - [`SmartForwarder`]: relays a record only when one of its fields changed
//!
//! [`Forwarder`] selects one of them once, from configuration. Both share the
//! lifecycle plumbing in this module: endpoints are handed over at
//! construction, `start()` moves them into two tokio tasks, and
//! `wait_for_stop()` joins those tasks.

use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use tokio::task::JoinHandle;

use crate::shutdown::ShutdownSignal;
use crate::stats::{ForwardingCounters, ForwardingStats};
use crate::traits::{
    DataForwarder, EndpointReader, EndpointWriter, ForwarderConfig, ForwarderError, ForwarderMode,
    ForwarderPhase, ForwarderResult,
};

mod basic;
mod smart;

pub use basic::BasicForwarder;
pub use smart::SmartForwarder;

#[cfg(test)]
pub(crate) mod mock;

/// The four endpoints a forwarder relays between
#[derive(Debug)]
pub struct Endpoints<SR, SW, UR, UW> {
    /// Serial read half (cockpit → connector)
    pub serial_reader: SR,
    /// Serial write half (connector → cockpit)
    pub serial_writer: SW,
    /// UDP socket receiving from the simulator
    pub udp_receiver: UR,
    /// UDP socket sending to the simulator
    pub udp_sender: UW,
}

/// Relay loop handles of a running forwarder
struct RelayTasks {
    serial_to_udp: JoinHandle<ForwarderResult<()>>,
    udp_to_serial: JoinHandle<ForwarderResult<()>>,
}

enum Lifecycle<E> {
    Idle(E),
    Running(RelayTasks),
    Stopped,
}

/// Lifecycle state machine shared by both forwarder policies
pub(crate) struct Relay<SR, SW, UR, UW> {
    name: &'static str,
    state: Lifecycle<Endpoints<SR, SW, UR, UW>>,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) config: ForwarderConfig,
    pub(crate) counters: Arc<ForwardingCounters>,
}

impl<SR, SW, UR, UW> Relay<SR, SW, UR, UW> {
    pub(crate) fn new(
        name: &'static str,
        endpoints: Endpoints<SR, SW, UR, UW>,
        shutdown: ShutdownSignal,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            name,
            state: Lifecycle::Idle(endpoints),
            shutdown,
            config,
            counters: Arc::new(ForwardingCounters::new()),
        }
    }

    /// Take the endpoints out of the idle state, moving to running
    ///
    /// `spawn` receives the endpoints and returns the two relay futures.
    pub(crate) fn launch<A, B>(
        &mut self,
        spawn: impl FnOnce(Endpoints<SR, SW, UR, UW>) -> (A, B),
    ) -> ForwarderResult<()>
    where
        A: Future<Output = ForwarderResult<()>> + Send + 'static,
        B: Future<Output = ForwarderResult<()>> + Send + 'static,
    {
        let endpoints = match std::mem::replace(&mut self.state, Lifecycle::Stopped) {
            Lifecycle::Idle(endpoints) => endpoints,
            other => {
                self.state = other;
                return Err(ForwarderError::AlreadyStarted);
            }
        };

        debug!("Starting {} forwarder read and write tasks", self.name);
        let (serial_to_udp, udp_to_serial) = spawn(endpoints);
        self.state = Lifecycle::Running(RelayTasks {
            serial_to_udp: tokio::spawn(serial_to_udp),
            udp_to_serial: tokio::spawn(udp_to_serial),
        });
        Ok(())
    }

    pub(crate) async fn join(&mut self) -> ForwarderResult<()> {
        let tasks = match std::mem::replace(&mut self.state, Lifecycle::Stopped) {
            Lifecycle::Running(tasks) => tasks,
            Lifecycle::Stopped => return Ok(()),
            idle @ Lifecycle::Idle(_) => {
                self.state = idle;
                return Err(ForwarderError::NotStarted);
            }
        };

        debug!("Awaiting {} forwarder serial reader task", self.name);
        let serial_to_udp = flatten(tasks.serial_to_udp.await);
        debug!("Awaiting {} forwarder serial writer task", self.name);
        let udp_to_serial = flatten(tasks.udp_to_serial.await);
        debug!("{} forwarder stopped", self.name);

        serial_to_udp.and(udp_to_serial)
    }

    pub(crate) fn phase(&self) -> ForwarderPhase {
        match self.state {
            Lifecycle::Idle(_) => ForwarderPhase::Idle,
            Lifecycle::Running(_) => ForwarderPhase::Running,
            Lifecycle::Stopped => ForwarderPhase::Stopped,
        }
    }

    pub(crate) fn stats(&self) -> ForwardingStats {
        self.counters.snapshot()
    }
}

fn flatten(joined: Result<ForwarderResult<()>, tokio::task::JoinError>) -> ForwarderResult<()> {
    joined.unwrap_or_else(|e| {
        error!("Relay task failed: {}", e);
        Err(ForwarderError::TaskFailed)
    })
}

/// Sort an I/O outcome into data, an absorbed shortfall, or a fatal error
///
/// `Ok(None)` means the loop should move on to its next pass.
pub(crate) fn absorb<T>(
    result: ForwarderResult<T>,
    counters: &ForwardingCounters,
    what: &str,
) -> ForwarderResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_transient() => {
            debug!("Ignoring transient error on {}: {}", what, e);
            counters.transient_error();
            Ok(None)
        }
        Err(e) => {
            error!("Stopping relay after error on {}: {}", what, e);
            Err(e)
        }
    }
}

/// Wait for a closed serial port to come back, or for cancellation
pub(crate) async fn wait_for_port(shutdown: &ShutdownSignal, config: &ForwarderConfig) {
    shutdown
        .until_cancelled(tokio::time::sleep(config.closed_port_poll))
        .await;
}

/// A forwarder of either policy
pub enum Forwarder<SR, SW, UR, UW> {
    Basic(BasicForwarder<SR, SW, UR, UW>),
    Smart(SmartForwarder<SR, SW, UR, UW>),
}

impl<SR, SW, UR, UW> Forwarder<SR, SW, UR, UW>
where
    SR: EndpointReader + 'static,
    SW: EndpointWriter + 'static,
    UR: EndpointReader + 'static,
    UW: EndpointWriter + 'static,
{
    /// Build the forwarder for `mode`
    pub fn new(
        mode: ForwarderMode,
        endpoints: Endpoints<SR, SW, UR, UW>,
        shutdown: ShutdownSignal,
        config: ForwarderConfig,
    ) -> Self {
        match mode {
            ForwarderMode::Basic => {
                Forwarder::Basic(BasicForwarder::with_config(endpoints, shutdown, config))
            }
            ForwarderMode::Smart => {
                Forwarder::Smart(SmartForwarder::with_config(endpoints, shutdown, config))
            }
        }
    }

    pub fn mode(&self) -> ForwarderMode {
        match self {
            Forwarder::Basic(_) => ForwarderMode::Basic,
            Forwarder::Smart(_) => ForwarderMode::Smart,
        }
    }
}

impl<SR, SW, UR, UW> DataForwarder for Forwarder<SR, SW, UR, UW>
where
    SR: EndpointReader + 'static,
    SW: EndpointWriter + 'static,
    UR: EndpointReader + 'static,
    UW: EndpointWriter + 'static,
{
    fn start(&mut self) -> ForwarderResult<()> {
        match self {
            Forwarder::Basic(forwarder) => forwarder.start(),
            Forwarder::Smart(forwarder) => forwarder.start(),
        }
    }

    async fn wait_for_stop(&mut self) -> ForwarderResult<()> {
        match self {
            Forwarder::Basic(forwarder) => forwarder.wait_for_stop().await,
            Forwarder::Smart(forwarder) => forwarder.wait_for_stop().await,
        }
    }

    fn phase(&self) -> ForwarderPhase {
        match self {
            Forwarder::Basic(forwarder) => forwarder.phase(),
            Forwarder::Smart(forwarder) => forwarder.phase(),
        }
    }

    fn stats(&self) -> ForwardingStats {
        match self {
            Forwarder::Basic(forwarder) => forwarder.stats(),
            Forwarder::Smart(forwarder) => forwarder.stats(),
        }
    }
}
