//! Endpoint adapters for tokio transports.
//!
//! - [`StreamReader`] / [`StreamWriter`]: the two halves of a byte stream,
//!   normally a serial port split with [`tokio::io::split`]
//! - [`UdpReceiver`] / [`UdpSender`]: a bound and a connected UDP socket
//!
//! Splitting the serial port gives the reading loop and the writing loop one
//! owned half each, so neither ever waits on the other.

use std::future::poll_fn;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::UdpSocket;

use crate::traits::{EndpointReader, EndpointWriter, ForwarderError, ForwarderResult};

/// Read half of a byte stream
///
/// Reports closed only once a read hit end of stream. That same read returns
/// [`ForwarderError::Disconnected`], which ends the reading loop, so the
/// loops' closed-port waiting never sees this adapter closed.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    open: bool,
}

impl<R> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, open: true }
    }
}

impl<R: AsyncRead + Unpin + Send> EndpointReader for StreamReader<R> {
    async fn read_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf).await?;
        if n == 0 {
            self.open = false;
            return Err(ForwarderError::Disconnected);
        }
        Ok(n)
    }

    async fn drain_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut read_buf = ReadBuf::new(buf);
        // Poll exactly once: pending means nothing is buffered right now
        let polled = poll_fn(|cx| match Pin::new(&mut self.inner).poll_read(cx, &mut read_buf) {
            Poll::Ready(result) => Poll::Ready(result.map(|()| true)),
            Poll::Pending => Poll::Ready(Ok(false)),
        })
        .await?;
        Ok(if polled { read_buf.filled().len() } else { 0 })
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn max_packet_size(&self) -> usize {
        crate::MAX_DATAGRAM_SIZE
    }
}

/// Write half of a byte stream
///
/// Reports closed only after a write failed with
/// [`ForwarderError::Disconnected`], which is fatal for the writing loop.
#[derive(Debug)]
pub struct StreamWriter<W> {
    inner: W,
    open: bool,
}

impl<W> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, open: true }
    }
}

impl<W: AsyncWrite + Unpin + Send> EndpointWriter for StreamWriter<W> {
    async fn write_from_slice(&mut self, data: &[u8]) -> ForwarderResult<usize> {
        match self.inner.write_all(data).await {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                let e = ForwarderError::from(e);
                if e == ForwarderError::Disconnected {
                    self.open = false;
                }
                Err(e)
            }
        }
    }

    async fn flush(&mut self) -> ForwarderResult<()> {
        self.inner.flush().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

/// UDP socket receiving datagrams from any sender
#[derive(Debug, Clone)]
pub struct UdpReceiver {
    socket: Arc<UdpSocket>,
}

impl UdpReceiver {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Bind a receiving socket on `addr`
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        Ok(Self::new(Arc::new(UdpSocket::bind(addr).await?)))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl EndpointReader for UdpReceiver {
    async fn read_into_slice(&mut self, buf: &mut [u8]) -> ForwarderResult<usize> {
        let (len, _from) = self.socket.recv_from(buf).await?;
        Ok(len)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn max_packet_size(&self) -> usize {
        crate::MAX_DATAGRAM_SIZE
    }
}

/// UDP socket connected to a single destination
#[derive(Debug, Clone)]
pub struct UdpSender {
    socket: Arc<UdpSocket>,
}

impl UdpSender {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Bind an ephemeral local port and connect it to `dest`
    pub async fn connect(dest: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if dest.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(dest).await?;
        Ok(Self::new(Arc::new(socket)))
    }
}

impl EndpointWriter for UdpSender {
    async fn write_from_slice(&mut self, data: &[u8]) -> ForwarderResult<usize> {
        Ok(self.socket.send(data).await?)
    }

    fn is_connected(&self) -> bool {
        true
    }
}
