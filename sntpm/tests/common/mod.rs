#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sntpm::{
    Error, Mode, NtpContext, NtpTimestamp, NtpUdpSocket, PacketBuilder, PacketFields,
    ReceivedPacket, ReferenceId, Result, TimeSource,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 2023-08-01, well inside NTP era 0
pub const BASE_TIME: f64 = 3_899_846_400.0;
pub const UNRESOLVABLE: &str = "unresolvable.invalid";

type Responder = Box<dyn Fn(&ReceivedPacket, SocketAddr) -> Vec<Vec<u8>> + Send + Sync>;
type Datagram = (Vec<u8>, SocketAddr);

/// Virtual clock following the (paused) Tokio clock
pub struct TestClock {
    start: Instant,
}

impl TestClock {
    pub fn new() -> Self {
        TestClock {
            start: Instant::now(),
        }
    }
}

impl TimeSource for TestClock {
    fn now(&self) -> f64 {
        BASE_TIME + self.start.elapsed().as_secs_f64()
    }
}

/// A request seen by the mock server
#[derive(Debug, Clone)]
pub struct Request {
    pub at: Instant,
    pub server: SocketAddr,
    pub packet: ReceivedPacket,
}

/// In-memory UDP socket with a scriptable server behind it.
///
/// Host names resolve to themselves when they are IP literals and to
/// 127.0.0.1 otherwise. Replies produced by the responder are delivered with
/// the request destination as their source.
pub struct MockSocket {
    responder: Mutex<Option<Responder>>,
    requests: Mutex<Vec<Request>>,
    fail_send: AtomicBool,
    inbox_tx: mpsc::UnboundedSender<Datagram>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

impl MockSocket {
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        MockSocket {
            responder: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            fail_send: AtomicBool::new(false),
            inbox_tx,
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
        }
    }

    // a responder may panic on purpose
    fn responder(&self) -> MutexGuard<'_, Option<Responder>> {
        self.responder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the server behaviour. Without a responder requests go
    /// unanswered.
    pub fn respond<F>(&self, responder: F)
    where
        F: Fn(&ReceivedPacket, SocketAddr) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        *self.responder() = Some(Box::new(responder));
    }

    pub fn silence(&self) {
        *self.responder() = None;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Delivers an unsolicited datagram
    pub fn inject(&self, bytes: Vec<u8>, source: SocketAddr) {
        self.inbox_tx.send((bytes, source)).unwrap();
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

impl NtpUdpSocket for MockSocket {
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<usize> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Error::Network);
        }

        let packet = ReceivedPacket::decode(buf).unwrap();
        self.requests.lock().unwrap().push(Request {
            at: Instant::now(),
            server: addr,
            packet,
        });

        let replies = match self.responder().as_ref() {
            Some(responder) => responder(&packet, addr),
            None => Vec::new(),
        };
        for reply in replies {
            self.inject(reply, addr);
        }

        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let mut inbox = self.inbox_rx.lock().await;
        let (bytes, source) = inbox.recv().await.ok_or(Error::Network)?;
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);

        Ok((len, source))
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr> {
        if host == UNRESOLVABLE {
            return Err(Error::AddressResolve);
        }

        let ip = host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        Ok(SocketAddr::new(ip, port))
    }
}

/// Shifts a timestamp by whole and fractional seconds without going through
/// floating point
pub fn shift(timestamp: NtpTimestamp, seconds: f64) -> NtpTimestamp {
    let delta = (seconds * 4_294_967_296.0).round() as i64;
    NtpTimestamp::from_bits(timestamp.to_bits().wrapping_add_signed(delta))
}

/// A valid stratum 1 reply from a server whose clock is `offset` seconds
/// ahead
pub fn server_reply(request: &ReceivedPacket, offset: f64, poll: i8) -> PacketBuilder {
    let transmit = request.transmit_timestamp();

    PacketBuilder::new()
        .with_version(4)
        .with_mode(Mode::Server)
        .with_stratum(1)
        .with_poll(poll)
        .with_precision(-20)
        .with_reference_id(ReferenceId::GPS)
        .with_reference_timestamp(shift(transmit, offset - 10.0))
        .with_originate_timestamp(transmit)
        .with_receive_timestamp(shift(transmit, offset))
        .with_transmit_timestamp(shift(transmit, offset))
}

/// Kiss-o'-Death reply carrying only version, mode and the kiss code
pub fn kiss_reply(request: &ReceivedPacket, code: ReferenceId, poll: i8) -> PacketBuilder {
    PacketBuilder::new()
        .with_version(4)
        .with_mode(Mode::Server)
        .with_poll(poll)
        .with_reference_id(code)
        .with_originate_timestamp(request.transmit_timestamp())
}

pub fn bytes(packet: &PacketBuilder) -> Vec<u8> {
    packet.encode().0.to_vec()
}

pub fn context() -> (Arc<MockSocket>, NtpContext<Arc<MockSocket>>) {
    let socket = Arc::new(MockSocket::new());
    let context = NtpContext::with_clock(Arc::clone(&socket), Arc::new(TestClock::new()));

    (socket, context)
}

pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Trace)
        .init();
}
