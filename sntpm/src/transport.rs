//! Shared socket demultiplexer
//!
//! All clients of a context send through one socket. Whichever pending query
//! is currently polling [`Transport::pump`] reads the next datagram and routes
//! it to the registered exchange it belongs to: by originate timestamp and
//! source address, then by originate timestamp alone, then by source address.
//! Datagrams matching nothing are dropped.
use core::net::SocketAddr;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::log::{debug, trace};
use crate::packet::{peek_originate, NtpTimestamp};
use crate::socket::NtpUdpSocket;
use crate::types::{Error, Result};

/// Receive buffer size, large enough for a header with extension fields
const RECV_BUFFER_SIZE: usize = 1024;

/// A datagram handed to a registered exchange
#[derive(Debug, Clone)]
pub(crate) struct Datagram {
    pub(crate) bytes: Vec<u8>,
    pub(crate) source: SocketAddr,
    /// Monotonic instant at which the datagram was read from the socket
    pub(crate) received_at: Instant,
}

struct Exchange {
    id: u64,
    server: SocketAddr,
    originate: NtpTimestamp,
    tx: mpsc::UnboundedSender<Datagram>,
}

/// Socket shared by clients, with reply routing
pub struct Transport<S> {
    socket: S,
    exchanges: Mutex<Vec<Exchange>>,
    next_id: AtomicU64,
}

impl<S> Transport<S> {
    pub fn new(socket: S) -> Self {
        Transport {
            socket,
            exchanges: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    fn exchanges(&self) -> MutexGuard<'_, Vec<Exchange>> {
        self.exchanges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an exchange with `server` whose replies carry `originate`
    pub(crate) fn register(
        self: &Arc<Self>,
        server: SocketAddr,
        originate: NtpTimestamp,
    ) -> Registration<S> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.exchanges().push(Exchange {
            id,
            server,
            originate,
            tx,
        });

        Registration {
            transport: Arc::clone(self),
            id,
            rx,
        }
    }

    fn unregister(&self, id: u64) {
        self.exchanges().retain(|exchange| exchange.id != id);
    }

    fn route(&self, datagram: Datagram) {
        let originate = peek_originate(&datagram.bytes).filter(|ts| !ts.is_zero());
        let exchanges = self.exchanges();
        let by_originate = |exchange: &&Exchange| Some(exchange.originate) == originate;
        let by_source = |exchange: &&Exchange| exchange.server == datagram.source;

        // Clients sending in the same clock tick share an originate timestamp
        let target = exchanges
            .iter()
            .find(|exchange| by_originate(exchange) && by_source(exchange))
            .or_else(|| exchanges.iter().find(by_originate))
            .or_else(|| exchanges.iter().find(by_source));

        match target {
            Some(exchange) => {
                // The receiving side may be gone if its query just completed
                let _ = exchange.tx.send(datagram);
            }
            None => trace!(
                "Dropping {} byte datagram from {}: no pending exchange",
                datagram.bytes.len(),
                datagram.source
            ),
        }
    }
}

impl<S: NtpUdpSocket> Transport<S> {
    /// Sends the whole buffer to `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if the socket fails or writes fewer bytes than given.
    pub(crate) async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<()> {
        let written = self.socket.send_to(buf, addr).await?;

        if written == buf.len() {
            Ok(())
        } else {
            debug!("Short write to {}: {} of {} bytes", addr, written, buf.len());
            Err(Error::Network)
        }
    }

    /// Reads one datagram from the socket and routes it. Cancellation safe
    /// as long as the socket's `recv_from` is.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] if receiving fails.
    pub(crate) async fn pump(&self) -> Result<()> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let (len, source) = self.socket.recv_from(&mut buf).await?;
        let received_at = Instant::now();

        self.route(Datagram {
            bytes: buf[..len.min(RECV_BUFFER_SIZE)].to_vec(),
            source,
            received_at,
        });

        Ok(())
    }
}

/// Receiving end of a registered exchange. Unregisters on drop.
pub(crate) struct Registration<S> {
    transport: Arc<Transport<S>>,
    id: u64,
    rx: mpsc::UnboundedReceiver<Datagram>,
}

impl<S> Registration<S> {
    pub(crate) async fn recv(&mut self) -> Option<Datagram> {
        self.rx.recv().await
    }
}

impl<S> Drop for Registration<S> {
    fn drop(&mut self) {
        self.transport.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketBuilder;

    fn datagram(originate: NtpTimestamp, source: SocketAddr) -> Datagram {
        Datagram {
            bytes: PacketBuilder::new()
                .with_originate_timestamp(originate)
                .encode()
                .0
                .to_vec(),
            source,
            received_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_route_by_originate_then_source() {
        let transport = Arc::new(Transport::new(()));
        let server_a: SocketAddr = "192.0.2.1:123".parse().unwrap();
        let server_b: SocketAddr = "192.0.2.2:123".parse().unwrap();
        let mut a = transport.register(server_a, NtpTimestamp::new(1, 0));
        let mut b = transport.register(server_b, NtpTimestamp::new(2, 0));

        // originate of b wins over the source address of a
        transport.route(datagram(NtpTimestamp::new(2, 0), server_a));
        let routed = b.recv().await.unwrap();
        assert_eq!(routed.source, server_a);

        // unknown originate falls back to the source address
        transport.route(datagram(NtpTimestamp::new(9, 0), server_a));
        assert_eq!(a.recv().await.unwrap().source, server_a);
    }

    #[tokio::test]
    async fn test_route_shared_originate_by_source() {
        let transport = Arc::new(Transport::new(()));
        let server_a: SocketAddr = "192.0.2.1:123".parse().unwrap();
        let server_b: SocketAddr = "192.0.2.2:123".parse().unwrap();
        let originate = NtpTimestamp::new(7, 0);
        let mut a = transport.register(server_a, originate);
        let mut b = transport.register(server_b, originate);

        transport.route(datagram(originate, server_b));
        transport.route(datagram(originate, server_a));

        assert_eq!(b.recv().await.unwrap().source, server_b);
        assert_eq!(a.recv().await.unwrap().source, server_a);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let transport = Arc::new(Transport::new(()));
        let server: SocketAddr = "192.0.2.1:123".parse().unwrap();
        let registration = transport.register(server, NtpTimestamp::new(1, 0));

        assert_eq!(transport.exchanges().len(), 1);
        drop(registration);
        assert!(transport.exchanges().is_empty());

        // unmatched datagrams are dropped silently
        transport.route(datagram(NtpTimestamp::new(1, 0), server));
    }
}
