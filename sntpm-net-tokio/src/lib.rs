//! Tokio async runtime UDP socket adapter for the [`sntpm`] SNTP client library.
//!
//! This crate provides a wrapper around [`tokio::net::UdpSocket`] that implements
//! the [`NtpUdpSocket`] trait, so clients and managers of `sntpm` can run on
//! the Tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use sntpm::{Client, ClientEndpoint, NtpContext};
//! use sntpm_net_tokio::UdpSocketWrapper;
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = UdpSocketWrapper::bind("0.0.0.0:0").await?;
//! let client = Client::new(
//!     ClientEndpoint::with_default_port("pool.ntp.org"),
//!     NtpContext::new(socket),
//! );
//!
//! match client.query_time().await.result {
//!     Ok(result) => println!("offset: {} s", result.offset()),
//!     Err(err) => eprintln!("Failed to get time: {err}"),
//! }
//! # Ok(())
//! # }
//! ```
use sntpm::{Error, NtpUdpSocket, Result};
use tokio::net::{ToSocketAddrs, UdpSocket};

use core::net::SocketAddr;

/// A wrapper around [`tokio::net::UdpSocket`] that implements [`NtpUdpSocket`].
///
/// Receiving is cancellation safe, so one wrapped socket can be shared by
/// all clients of an [`sntpm::NtpContext`].
#[derive(Debug)]
pub struct UdpSocketWrapper {
    socket: UdpSocket,
}

impl UdpSocketWrapper {
    /// Creates a new `UdpSocketWrapper` from a [`tokio::net::UdpSocket`].
    #[must_use]
    pub fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }

    /// Binds a new socket to `addr` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of [`UdpSocket::bind`].
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        UdpSocket::bind(addr).await.map(Self::new)
    }

    /// # Errors
    ///
    /// Returns the I/O error of [`UdpSocket::local_addr`].
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    #[must_use]
    pub fn into_inner(self) -> UdpSocket {
        self.socket
    }
}

impl From<UdpSocket> for UdpSocketWrapper {
    /// Converts a [`tokio::net::UdpSocket`] into a `UdpSocketWrapper`.
    fn from(socket: UdpSocket) -> Self {
        UdpSocketWrapper::new(socket)
    }
}

impl NtpUdpSocket for UdpSocketWrapper {
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        self.socket.send_to(buf, addr).await.map_err(|_| Error::Network)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await.map_err(|_| Error::Network)
    }
}
