//! In-memory endpoints for exercising the relay loops.
//!
//! Every chunk pushed through `serial_in` arrives as one burst on the serial
//! line: the first read returns part of it and a drain returns the rest, so a
//! chunk maps onto exactly one pass of a serial reading loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::Endpoints;
use crate::traits::{EndpointReader, EndpointWriter, ForwarderResult};

const WAIT: Duration = Duration::from_secs(2);

pub(crate) struct MockSerialReader {
    rx: UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    open: Arc<AtomicBool>,
}

impl MockSerialReader {
    fn take(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl EndpointReader for MockSerialReader {
    async fn read_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        while self.pending.is_empty() {
            match self.rx.recv().await {
                Some(chunk) => self.pending = chunk,
                None => std::future::pending::<()>().await,
            }
        }
        Ok(self.take(buf))
    }

    async fn drain_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        Ok(self.take(buf))
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn max_packet_size(&self) -> usize {
        4096
    }
}

pub(crate) struct MockDatagramReader {
    rx: UnboundedReceiver<Vec<u8>>,
}

impl EndpointReader for MockDatagramReader {
    async fn read_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        let Some(datagram) = self.rx.recv().await else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        let n = buf.len().min(datagram.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(n)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn max_packet_size(&self) -> usize {
        crate::MAX_DATAGRAM_SIZE
    }
}

pub(crate) struct MockWriter {
    tx: UnboundedSender<Vec<u8>>,
    open: Arc<AtomicBool>,
}

impl EndpointWriter for MockWriter {
    async fn write_from_slice(&mut self, data: &[u8]) -> ForwarderResult<usize> {
        let _ = self.tx.send(data.to_vec());
        Ok(data.len())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub(crate) type MockEndpoints =
    Endpoints<MockSerialReader, MockWriter, MockDatagramReader, MockWriter>;

/// Test side of the mock endpoints
pub(crate) struct MockHarness {
    /// Bytes the cockpit device sends
    pub serial_in: UnboundedSender<Vec<u8>>,
    /// Bytes written to the cockpit device
    pub serial_out: UnboundedReceiver<Vec<u8>>,
    /// Datagrams from the simulator
    pub udp_in: UnboundedSender<Vec<u8>>,
    /// Datagrams sent to the simulator
    pub udp_out: UnboundedReceiver<Vec<u8>>,
    /// Open state of both serial halves
    pub serial_open: Arc<AtomicBool>,
}

impl MockHarness {
    pub fn device_sends(&self, bytes: &[u8]) {
        self.serial_in.send(bytes.to_vec()).unwrap();
    }

    pub fn simulator_sends(&self, bytes: &[u8]) {
        self.udp_in.send(bytes.to_vec()).unwrap();
    }

    pub async fn next_datagram(&mut self) -> Vec<u8> {
        tokio::time::timeout(WAIT, self.udp_out.recv())
            .await
            .expect("timed out waiting for a datagram")
            .expect("udp channel closed")
    }

    pub async fn next_serial_write(&mut self) -> Vec<u8> {
        tokio::time::timeout(WAIT, self.serial_out.recv())
            .await
            .expect("timed out waiting for a serial write")
            .expect("serial channel closed")
    }

    pub fn assert_no_datagram(&mut self) {
        if let Ok(extra) = self.udp_out.try_recv() {
            panic!("unexpected datagram {:?}", String::from_utf8_lossy(&extra));
        }
    }

    pub fn assert_no_serial_write(&mut self) {
        if let Ok(extra) = self.serial_out.try_recv() {
            panic!("unexpected serial write {:?}", String::from_utf8_lossy(&extra));
        }
    }
}

pub(crate) fn endpoints() -> (MockEndpoints, MockHarness) {
    let (serial_in, serial_rx) = mpsc::unbounded_channel();
    let (serial_tx, serial_out) = mpsc::unbounded_channel();
    let (udp_in, udp_rx) = mpsc::unbounded_channel();
    let (udp_tx, udp_out) = mpsc::unbounded_channel();
    let serial_open = Arc::new(AtomicBool::new(true));

    let parts = Endpoints {
        serial_reader: MockSerialReader {
            rx: serial_rx,
            pending: Vec::new(),
            open: serial_open.clone(),
        },
        serial_writer: MockWriter {
            tx: serial_tx,
            open: serial_open.clone(),
        },
        udp_receiver: MockDatagramReader { rx: udp_rx },
        udp_sender: MockWriter {
            tx: udp_tx,
            open: Arc::new(AtomicBool::new(true)),
        },
    };

    let harness = MockHarness {
        serial_in,
        serial_out,
        udp_in,
        udp_out,
        serial_open,
    };
    (parts, harness)
}
