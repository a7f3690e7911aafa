//! # Differential Forwarder
//!
//! The cockpit firmware and FlightGear both repeat full state snapshots, one
//! record per line, even when nothing changed. This forwarder keeps the last
//! value of every field position, per direction, and relays a record only
//! when at least one position differs.
//!
//! ## UDP → Serial
//!
//! Each datagram is one record. If any field differs from `to_serial`, the
//! received datagram bytes are written to the serial line.
//!
//! ## Serial → UDP
//!
//! Serial bytes are accumulated into newline-terminated records. The records
//! completed by the first pass that completes any are only used to create
//! field positions: they may have been captured mid-stream. After that, each
//! record that changes `from_serial` sends the whole vector, re-encoded, as
//! one datagram.

use std::sync::Arc;

use log::{debug, trace, warn};

use super::{absorb, wait_for_port, Endpoints, Relay};
use crate::buffer::RecordBuffer;
use crate::protocol::{FieldVector, Record};
use crate::shutdown::ShutdownSignal;
use crate::stats::{ForwardingCounters, ForwardingStats};
use crate::traits::{
    DataForwarder, EndpointReader, EndpointWriter, ForwarderConfig, ForwarderPhase, ForwarderResult,
};

/// A forwarder that only relays records with changed fields
pub struct SmartForwarder<SR, SW, UR, UW> {
    relay: Relay<SR, SW, UR, UW>,
}

impl<SR, SW, UR, UW> SmartForwarder<SR, SW, UR, UW>
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
            relay: Relay::new("smart", endpoints, shutdown, config),
        }
    }
}

impl<SR, SW, UR, UW> DataForwarder for SmartForwarder<SR, SW, UR, UW>
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

async fn udp_to_serial<R: EndpointReader, W: EndpointWriter>(
    mut udp: R,
    mut serial: W,
    shutdown: ShutdownSignal,
    counters: Arc<ForwardingCounters>,
) -> ForwarderResult<()> {
    let mut datagram = vec![0u8; udp.max_packet_size()];
    let mut to_serial = FieldVector::new();
    debug!("Smart UDP reader (serial writer) started");

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
        if !serial.is_connected() {
            debug!("Serial port closed, dropping datagram of {} bytes", len);
            continue;
        }

        let raw = &datagram[..len];
        let record = Record::from_bytes(raw);
        if !to_serial.apply(record.fields()) {
            counters.record_unchanged();
            continue;
        }

        debug!("Output from FlightGear changed, updating serial: {}", record.as_str());
        let written = serial.write_from_slice(raw).await;
        if let Some(written) = absorb(written, &counters, "serial write")? {
            absorb(serial.flush().await, &counters, "serial flush")?;
            counters.serial_written(written);
        }
    }

    debug!("Smart UDP reader (serial writer) stopped");
    Ok(())
}

async fn serial_to_udp<R: EndpointReader, W: EndpointWriter>(
    mut serial: R,
    mut udp: W,
    shutdown: ShutdownSignal,
    config: ForwarderConfig,
    counters: Arc<ForwardingCounters>,
) -> ForwarderResult<()> {
    let mut first = [0u8; 1];
    let mut chunk = vec![0u8; config.serial_read_size];
    let mut pending = RecordBuffer::new();
    let mut from_serial = FieldVector::new();
    let mut first_round = true;
    debug!("Smart serial reader (UDP writer) started");

    while !shutdown.is_cancelled() {
        if !serial.is_connected() {
            wait_for_port(&shutdown, &config).await;
            continue;
        }

        // One byte at a time is the sync point; the rest of the burst is drained below
        let Some(read) = shutdown.until_cancelled(serial.read_into_slice(&mut first)).await else {
            break;
        };
        let Some(read) = absorb(read, &counters, "serial read")? else {
            continue;
        };
        if read == 0 || !serial.is_connected() {
            continue;
        }
        pending.push(&first[..read]);

        let drained = serial.drain_into_slice(&mut chunk).await;
        let extra = absorb(drained, &counters, "serial read")?.unwrap_or(0);
        pending.push(&chunk[..extra]);
        counters.serial_read(read + extra);

        let records = pending.drain_records();
        if records.is_empty() {
            trace!("{} bytes of a partial record pending", pending.pending_len());
            continue;
        }
        counters.records_framed(records.len());

        // Checked once per pass: every record of the first productive pass only primes
        if first_round {
            for record in &records {
                let blanks = vec![""; record.fields().count()];
                if from_serial.encoded_len_with(&blanks) > config.max_datagram_size {
                    warn!("Not priming from a serial record with {} fields", blanks.len());
                    counters.record_oversized();
                    continue;
                }
                trace!("Priming from serial record: {}", record.as_str());
                from_serial.prime(blanks);
                counters.records_primed(1);
            }
            first_round = false;
            continue;
        }

        for record in records {
            let fields: Vec<&str> = record.fields().collect();
            if from_serial.encoded_len_with(&fields) > config.max_datagram_size {
                warn!(
                    "Dropping serial record of {} bytes: the update would not fit in a datagram",
                    record.as_str().len()
                );
                counters.record_oversized();
                continue;
            }
            if !from_serial.apply(fields) {
                counters.record_unchanged();
                continue;
            }
            if shutdown.is_cancelled() {
                break;
            }

            let payload = from_serial.encode_record();
            debug!(
                "Output from serial changed, updating FlightGear: {}",
                String::from_utf8_lossy(&payload).trim_end()
            );
            if let Some(sent) = absorb(udp.write_from_slice(&payload).await, &counters, "UDP send")? {
                counters.datagram_sent(sent);
            }
        }
    }

    debug!("Smart serial reader (UDP writer) stopped");
    Ok(())
}
