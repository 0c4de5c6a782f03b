//! UDP socket seam
use core::future::Future;
use core::net::SocketAddr;
use std::sync::Arc;

use crate::types::{Error, Result};

/// A trait encapsulating UDP socket interface required for SNTP communication.
///
/// Implementations are shared between all clients of an
/// [`NtpContext`](crate::NtpContext), so every method takes `&self`.
///
/// # Example
///
/// ```no_run
/// use sntpm::{Error, NtpUdpSocket, Result};
/// use std::net::SocketAddr;
/// use tokio::net::UdpSocket;
///
/// struct Socket(UdpSocket);
///
/// impl NtpUdpSocket for Socket {
///     async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
///         self.0.send_to(buf, addr).await.map_err(|_| Error::Network)
///     }
///
///     async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
///         self.0.recv_from(buf).await.map_err(|_| Error::Network)
///     }
/// }
/// ```
pub trait NtpUdpSocket: Send + Sync {
    /// Send the given buffer to an address provided.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the datagram cannot be sent.
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> impl Future<Output = Result<usize>> + Send;

    /// Receive a single datagram message on the socket. Must be cancellation
    /// safe: dropping the future before completion loses no datagram.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if receiving fails.
    fn recv_from(&self, buf: &mut [u8]) -> impl Future<Output = Result<(usize, SocketAddr)>> + Send;

    /// Resolve a server host name. The default implementation uses the
    /// system resolver and picks the first address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressResolve`] if the host has no address.
    fn resolve(&self, host: &str, port: u16) -> impl Future<Output = Result<SocketAddr>> + Send {
        async move {
            tokio::net::lookup_host((host, port))
                .await
                .map_err(|_| Error::AddressResolve)?
                .next()
                .ok_or(Error::AddressResolve)
        }
    }
}

impl<T: NtpUdpSocket> NtpUdpSocket for Arc<T> {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> impl Future<Output = Result<usize>> + Send {
        (**self).send_to(buf, addr)
    }

    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddr)>> + Send {
        (**self).recv_from(buf)
    }

    fn resolve(&self, host: &str, port: u16) -> impl Future<Output = Result<SocketAddr>> + Send {
        (**self).resolve(host, port)
    }
}
