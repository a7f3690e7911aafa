//! Raw passthrough forwarder.
//!
//! Whatever arrives on one side leaves on the other, byte for byte. No
//! framing and no change detection; this is the fallback and debug mode.

use std::sync::Arc;

use log::{debug, trace};

use super::{absorb, wait_for_port, Endpoints, Relay};
use crate::shutdown::ShutdownSignal;
use crate::stats::{ForwardingCounters, ForwardingStats};
use crate::traits::{
    DataForwarder, EndpointReader, EndpointWriter, ForwarderConfig, ForwarderPhase, ForwarderResult,
};

/// A forwarder that copies all incoming and outgoing data verbatim
pub struct BasicForwarder<SR, SW, UR, UW> {
    relay: Relay<SR, SW, UR, UW>,
}

impl<SR, SW, UR, UW> BasicForwarder<SR, SW, UR, UW>
where
    SR: EndpointReader + 'static,
    SW: EndpointWriter + 'static,
    UR: EndpointReader + 'static,
    UW: EndpointWriter + 'static,
{
    pub fn new(endpoints: Endpoints<SR, SW, UR, UW>, shutdown: ShutdownSignal) -> Self {
        Self::with_config(endpoints, shutdown, ForwarderConfig::default())
    }

    pub fn with_config(
        endpoints: Endpoints<SR, SW, UR, UW>,
        shutdown: ShutdownSignal,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            relay: Relay::new("basic", endpoints, shutdown, config),
        }
    }
}

impl<SR, SW, UR, UW> DataForwarder for BasicForwarder<SR, SW, UR, UW>
where
    SR: EndpointReader + 'static,
    SW: EndpointWriter + 'static,
    UR: EndpointReader + 'static,
    UW: EndpointWriter + 'static,
{
    fn start(&mut self) -> ForwarderResult<()> {
        let shutdown = self.relay.shutdown.clone();
        let config = self.relay.config.clone();
        let counters = self.relay.counters.clone();
        self.relay.launch(move |endpoints| {
            let outbound = serial_to_udp(
                endpoints.serial_reader,
                endpoints.udp_sender,
                shutdown.clone(),
                config,
                counters.clone(),
            );
            let inbound = udp_to_serial(
                endpoints.udp_receiver,
                endpoints.serial_writer,
                shutdown,
                counters,
            );
            (outbound, inbound)
        })
    }

    async fn wait_for_stop(&mut self) -> ForwarderResult<()> {
        self.relay.join().await
    }

    fn phase(&self) -> ForwarderPhase {
        self.relay.phase()
    }

    fn stats(&self) -> ForwardingStats {
        self.relay.stats()
    }
}

/// Serial → UDP: each burst of serial bytes becomes one datagram
async fn serial_to_udp<R: EndpointReader, W: EndpointWriter>(
    mut serial: R,
    mut udp: W,
    shutdown: ShutdownSignal,
    config: ForwarderConfig,
    counters: Arc<ForwardingCounters>,
) -> ForwarderResult<()> {
    // A pass never gathers more than one datagram can carry
    let pass_size = (1 + config.serial_read_size).min(config.max_datagram_size.max(1));
    let mut buf = vec![0u8; pass_size];
    debug!("Basic serial reader (UDP writer) started");

    while !shutdown.is_cancelled() {
        if !serial.is_connected() {
            wait_for_port(&shutdown, &config).await;
            continue;
        }

        let Some(read) = shutdown
            .until_cancelled(serial.read_into_slice(&mut buf[..1]))
            .await
        else {
            break;
        };
        let Some(first) = absorb(read, &counters, "serial read")? else {
            continue;
        };
        if first == 0 || !serial.is_connected() {
            continue;
        }

        let drained = serial.drain_into_slice(&mut buf[1..]).await;
        let extra = absorb(drained, &counters, "serial read")?.unwrap_or(0);
        let len = first + extra;
        counters.serial_read(len);

        if shutdown.is_cancelled() {
            break;
        }
        trace!("Serial -> UDP {} bytes", len);
        if let Some(sent) = absorb(udp.write_from_slice(&buf[..len]).await, &counters, "UDP send")? {
            counters.datagram_sent(sent);
        }
    }

    debug!("Basic serial reader (UDP writer) stopped");
    Ok(())
}

/// UDP → Serial: each non-empty datagram is written to the serial line as is
async fn udp_to_serial<R: EndpointReader, W: EndpointWriter>(
    mut udp: R,
    mut serial: W,
    shutdown: ShutdownSignal,
    counters: Arc<ForwardingCounters>,
) -> ForwarderResult<()> {
    let mut datagram = vec![0u8; udp.max_packet_size()];
    debug!("Basic UDP reader (serial writer) started");

    while !shutdown.is_cancelled() {
        let Some(received) = shutdown
            .until_cancelled(udp.read_into_slice(&mut datagram))
            .await
        else {
            break;
        };
        let Some(len) = absorb(received, &counters, "UDP receive")? else {
            continue;
        };
        counters.datagram_received();

        if shutdown.is_cancelled() {
            break;
        }
        if len == 0 || !serial.is_connected() {
            continue;
        }

        trace!("UDP -> Serial {} bytes", len);
        let written = serial.write_from_slice(&datagram[..len]).await;
        if let Some(written) = absorb(written, &counters, "serial write")? {
            absorb(serial.flush().await, &counters, "serial flush")?;
            counters.serial_written(written);
        }
    }

    debug!("Basic UDP reader (serial writer) stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::mock::endpoints;
    use super::*;
    use crate::shutdown;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serial_bursts_are_mirrored() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        harness.device_sends(b"1,2,3\n");
        assert_eq!(harness.next_datagram().await, b"1,2,3\n".to_vec());

        // Identical data is not suppressed
        harness.device_sends(b"1,2,3\n");
        assert_eq!(harness.next_datagram().await, b"1,2,3\n".to_vec());

        // No framing: partial records go out as they come
        harness.device_sends(b"4,5");
        assert_eq!(harness.next_datagram().await, b"4,5".to_vec());

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
        harness.assert_no_datagram();

        let stats = forwarder.stats();
        assert_eq!(stats.datagrams_sent, 3);
        assert_eq!(stats.serial_bytes_read, 15);
    }

    #[tokio::test]
    async fn test_arbitrary_bytes_are_mirrored() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        let payload: Vec<u8> = (0..=255u8).collect();
        harness.device_sends(&payload);
        harness.simulator_sends(&payload);

        assert_eq!(harness.next_datagram().await, payload);
        assert_eq!(harness.next_serial_write().await, payload);

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_datagrams_are_written_verbatim() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        harness.simulator_sends(b"");
        harness.simulator_sends(b"0.5,1\n");
        harness.simulator_sends(b"0.5,1\n");

        // The empty datagram is skipped, duplicates are not
        assert_eq!(harness.next_serial_write().await, b"0.5,1\n".to_vec());
        assert_eq!(harness.next_serial_write().await, b"0.5,1\n".to_vec());

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
        harness.assert_no_serial_write();
        assert_eq!(forwarder.stats().datagrams_received, 3);
        assert_eq!(forwarder.stats().serial_writes, 2);
    }

    #[tokio::test]
    async fn test_closed_port_drops_datagrams() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        harness.serial_open.store(false, Ordering::SeqCst);
        harness.simulator_sends(b"lost");
        tokio::time::sleep(Duration::from_millis(50)).await;

        harness.serial_open.store(true, Ordering::SeqCst);
        harness.simulator_sends(b"kept");
        assert_eq!(harness.next_serial_write().await, b"kept".to_vec());

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
        harness.assert_no_serial_write();
    }

    #[tokio::test]
    async fn test_outbound_waits_for_closed_port() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        harness.serial_open.store(false, Ordering::SeqCst);
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        harness.device_sends(b"held");
        tokio::time::sleep(Duration::from_millis(50)).await;
        harness.assert_no_datagram();

        harness.serial_open.store(true, Ordering::SeqCst);
        assert_eq!(harness.next_datagram().await, b"held".to_vec());

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
        assert_eq!(forwarder.stats().serial_bytes_read, 4);
    }

    #[tokio::test]
    async fn test_cancel_while_port_closed() {
        let (trigger, signal) = shutdown::channel();
        let (parts, harness) = endpoints();
        harness.serial_open.store(false, Ordering::SeqCst);
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
        tokio::time::timeout(Duration::from_secs(2), forwarder.wait_for_stop())
            .await
            .expect("loops should observe cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn test_serial_pass_never_exceeds_datagram_size() {
        let (trigger, signal) = shutdown::channel();
        let (parts, mut harness) = endpoints();
        let config = ForwarderConfig {
            max_datagram_size: 4,
            ..ForwarderConfig::default()
        };
        let mut forwarder = BasicForwarder::with_config(parts, signal, config);
        forwarder.start().unwrap();

        harness.device_sends(b"abcdefghij");
        let mut received = Vec::new();
        while received.len() < 10 {
            let datagram = harness.next_datagram().await;
            assert!(datagram.len() <= 4);
            received.extend(datagram);
        }
        assert_eq!(received, b"abcdefghij".to_vec());

        trigger.cancel();
        forwarder.wait_for_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_loops() {
        let (trigger, signal) = shutdown::channel();
        let (parts, _harness) = endpoints();
        let mut forwarder = BasicForwarder::new(parts, signal);
        forwarder.start().unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
        tokio::time::timeout(Duration::from_secs(2), forwarder.wait_for_stop())
            .await
            .expect("loops should observe cancellation")
            .unwrap();
    }
}
