//! Per-server query engine
use core::fmt::{self, Display, Formatter};
use core::str::FromStr;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{
    sanitize_timeout, sanitize_timeout_secs, ClientConfig, DEFAULT_NTP_PORT, MAX_POLL_EXPONENT,
    MAX_TIMEOUT, MIN_POLL_INTERVAL,
};
use crate::log::{debug, trace, warn};
use crate::packet::{
    KissCode, Mode, NtpTimestamp, PacketBuilder, PacketFields, ReceivedPacket, NTP_VERSION,
};
use crate::socket::NtpUdpSocket;
use crate::transport::{Datagram, Registration, Transport};
use crate::types::{Error, InvalidResponse, NtpResult, QueryOutcome, RequestWindow, Result};
use crate::NtpContext;

/// Number of completed exchanges whose late replies are recognised as strays
const RECENT_ORIGINATES: usize = 8;

/// Identity of a time server: host name or address plus UDP port
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientEndpoint {
    host: String,
    port: u16,
}

impl ClientEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientEndpoint {
            host: host.into(),
            port,
        }
    }

    /// Endpoint on the standard NTP port 123
    pub fn with_default_port(host: impl Into<String>) -> Self {
        ClientEndpoint::new(host, DEFAULT_NTP_PORT)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Display for ClientEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Error returned when parsing a [`ClientEndpoint`] fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server endpoint `{0}`")]
pub struct ParseEndpointError(String);

impl FromStr for ClientEndpoint {
    type Err = ParseEndpointError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let invalid = || ParseEndpointError(s.to_owned());

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => DEFAULT_NTP_PORT,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|port| port.parse().ok())
                    .ok_or_else(invalid)?,
            };

            return Ok(ClientEndpoint::new(host, port));
        }

        match s.split_once(':') {
            _ if s.is_empty() => Err(invalid()),
            // bare IPv6 address
            Some(_) if s.matches(':').count() > 1 => {
                Ok(ClientEndpoint::with_default_port(s))
            }
            Some((host, port)) if !host.is_empty() => port
                .parse()
                .map(|port| ClientEndpoint::new(host, port))
                .map_err(|_| invalid()),
            Some(_) => Err(invalid()),
            None => Ok(ClientEndpoint::with_default_port(s)),
        }
    }
}

/// Interpretation of a reply routed to a pending query
enum Verdict {
    /// Late reply to one of this client's earlier exchanges
    Stray,
    Complete {
        result: Result<NtpResult>,
        /// Poll exponent of an accepted reply
        poll: Option<i8>,
    },
}

/// Outstanding request of a client
struct QueryState<S> {
    originate: NtpTimestamp,
    deadline: Instant,
    registration: Registration<S>,
}

#[derive(Default)]
struct History {
    recent: VecDeque<NtpTimestamp>,
}

impl History {
    fn remember(&mut self, originate: NtpTimestamp) {
        if self.recent.len() == RECENT_ORIGINATES {
            self.recent.pop_front();
        }
        self.recent.push_back(originate);
    }

    fn contains(&self, originate: NtpTimestamp) -> bool {
        self.recent.contains(&originate)
    }
}

/// SNTP client bound to one server endpoint.
///
/// At most one request is outstanding at a time: concurrent calls to
/// [`Client::query_time`] are served one after the other in call order.
pub struct Client<S> {
    endpoint: ClientEndpoint,
    context: NtpContext<S>,
    timeout: Mutex<Duration>,
    history: tokio::sync::Mutex<History>,
}

impl<S: NtpUdpSocket> Client<S> {
    pub fn new(endpoint: ClientEndpoint, context: NtpContext<S>) -> Self {
        Client::with_config(endpoint, context, ClientConfig::default())
    }

    pub fn with_config(
        endpoint: ClientEndpoint,
        context: NtpContext<S>,
        config: ClientConfig,
    ) -> Self {
        Client {
            endpoint,
            context,
            timeout: Mutex::new(sanitize_timeout(config.timeout)),
            history: tokio::sync::Mutex::new(History::default()),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &ClientEndpoint {
        &self.endpoint
    }

    /// Reply timeout used by [`Client::query_time`]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        *self.timeout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the reply timeout. Zero falls back to the default of 10 s.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.lock().unwrap_or_else(PoisonError::into_inner) =
            sanitize_timeout(timeout);
    }

    /// Sets the reply timeout in seconds. Zero, negative and non-finite
    /// values fall back to the default of 10 s.
    pub fn set_timeout_secs(&self, secs: f64) {
        self.set_timeout(sanitize_timeout_secs(secs));
    }

    /// Queries the server once using the configured timeout
    pub async fn query_time(&self) -> QueryOutcome {
        self.query_time_with_timeout(self.timeout()).await
    }

    /// Queries the server once.
    ///
    /// Never fails as such: every error is reported in the returned
    /// [`QueryOutcome`] together with the earliest time the server may be
    /// queried again.
    pub async fn query_time_with_timeout(&self, timeout: Duration) -> QueryOutcome {
        let timeout = sanitize_timeout(timeout);
        let mut history = self.history.lock().await;
        let clock = &self.context.clock;
        let transport = &self.context.transport;

        let server = match transport
            .socket()
            .resolve(self.endpoint.host(), self.endpoint.port())
            .await
        {
            Ok(server) => server,
            Err(err) => {
                warn!("Unable to resolve {}: {}", self.endpoint, err);
                return complete(Err(err), None, clock.now());
            }
        };

        let request_date = clock.now();
        let originate = NtpTimestamp::from_seconds(request_date);
        let mut state = QueryState {
            originate,
            deadline: deadline_after(timeout),
            registration: transport.register(server, originate),
        };
        let request = PacketBuilder::client_request(originate).encode();

        debug!("Sending request to {} ({}), originate {}", self.endpoint, server, originate);

        if let Err(err) = transport.send_to(request.as_ref(), server).await {
            warn!("Unable to send request to {}: {}", self.endpoint, err);
            history.remember(originate);
            return complete(Err(err), None, request_date);
        }

        let (result, poll) = self.await_reply(transport, &mut state, &history).await;

        history.remember(originate);
        drop(state);

        match &result {
            Ok(ntp) => debug!(
                "Reply from {}: offset {:.6} s, delay {:.6} s, stratum {}",
                self.endpoint, ntp.offset, ntp.roundtrip, ntp.stratum
            ),
            Err(err) => warn!("Query to {} failed: {}", self.endpoint, err),
        }

        complete(result, poll, request_date)
    }

    async fn await_reply(
        &self,
        transport: &Transport<S>,
        state: &mut QueryState<S>,
        history: &History,
    ) -> (Result<NtpResult>, Option<i8>) {
        let sleep = tokio::time::sleep_until(state.deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                Some(datagram) = state.registration.recv() => {
                    match self.process(&datagram, state.originate, history) {
                        Verdict::Stray => continue,
                        Verdict::Complete { result, poll } => return (result, poll),
                    }
                }
                pumped = transport.pump() => {
                    if let Err(err) = pumped {
                        return (Err(err), None);
                    }
                }
                () = &mut sleep => return (Err(Error::Timeout), None),
            }
        }
    }

    fn process(&self, datagram: &Datagram, originate: NtpTimestamp, history: &History) -> Verdict {
        let destination = NtpTimestamp::from_seconds(
            self.context.clock.now() - datagram.received_at.elapsed().as_secs_f64(),
        );
        let packet = match ReceivedPacket::decode(&datagram.bytes) {
            Ok(packet) => packet,
            Err(err) => {
                return Verdict::Complete {
                    result: Err(err.into()),
                    poll: None,
                }
            }
        };

        packet.trace_dump(destination);

        let reply_originate = packet.originate_timestamp();
        if reply_originate != originate && history.contains(reply_originate) {
            trace!(
                "Ignoring stray reply from {} for originate {}",
                datagram.source, reply_originate
            );
            return Verdict::Stray;
        }

        match process_response(&packet, originate, destination) {
            Ok(result) => Verdict::Complete {
                poll: Some(result.poll),
                result: Ok(result),
            },
            Err(Error::RateLimitExceeded) => Verdict::Complete {
                result: Err(Error::RateLimitExceeded),
                poll: Some(packet.poll()),
            },
            Err(err) => Verdict::Complete {
                result: Err(err),
                poll: None,
            },
        }
    }
}

/// Instant `timeout` from now, saturating at the latest representable one
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();

    now.checked_add(timeout)
        .or_else(|| now.checked_add(MAX_TIMEOUT))
        .unwrap_or(now)
}

fn complete(result: Result<NtpResult>, poll: Option<i8>, request_date: f64) -> QueryOutcome {
    QueryOutcome {
        next_request_window: next_request_window(request_date, &result, poll),
        result,
        request_date,
    }
}

/// Earliest time of the next request: `request_date + max(2^poll, 15 s)`
/// with the poll exponent capped, or never after an access denial.
pub(crate) fn next_request_window(
    request_date: f64,
    result: &Result<NtpResult>,
    poll: Option<i8>,
) -> RequestWindow {
    if matches!(result, Err(err) if err.is_fatal()) {
        return RequestWindow::DistantFuture;
    }

    let interval = poll.map_or(MIN_POLL_INTERVAL, |poll| {
        2f64.powi(i32::from(poll.min(MAX_POLL_EXPONENT)))
            .max(MIN_POLL_INTERVAL)
    });

    RequestWindow::At(request_date + interval)
}

/// Validates a server reply to a request sent at `originate` and computes
/// the clock offset. `destination` is the local time the reply arrived.
///
/// # Errors
///
/// The first failing check wins: originate, version, mode, Kiss-o'-Death,
/// stratum, transmit timestamp, receive timestamp.
pub fn process_response(
    packet: &ReceivedPacket,
    originate: NtpTimestamp,
    destination: NtpTimestamp,
) -> Result<NtpResult> {
    if packet.originate_timestamp() != originate {
        warn!(
            "Originate timestamp mismatch: expected {}, got {}",
            originate,
            packet.originate_timestamp()
        );
        return Err(InvalidResponse::OriginateMismatch.into());
    }

    if packet.version() != NTP_VERSION {
        return Err(InvalidResponse::UnsupportedVersion(packet.version()).into());
    }

    if packet.mode() != Mode::Server {
        return Err(InvalidResponse::UnexpectedMode(packet.mode()).into());
    }

    if let Some(kiss) = packet.kiss_code() {
        warn!("Kiss-o'-Death received: {}", kiss);

        return Err(match kiss {
            KissCode::Rate => Error::RateLimitExceeded,
            code => Error::AccessDenied(code),
        });
    }

    if packet.stratum() > 15 {
        return Err(InvalidResponse::InvalidStratum(packet.stratum()).into());
    }

    if packet.transmit_timestamp().is_zero() {
        return Err(InvalidResponse::ZeroTransmitTimestamp.into());
    }

    if packet.receive_timestamp().seconds_since(originate) < 0.0 {
        return Err(InvalidResponse::ReceiveBeforeOriginate.into());
    }

    let t1 = originate.to_bits();
    let t2 = packet.receive_timestamp().to_bits();
    let t3 = packet.transmit_timestamp().to_bits();
    let t4 = destination.to_bits();

    Ok(NtpResult {
        offset: offset_calculate(t1, t2, t3, t4),
        roundtrip: roundtrip_calculate(t1, t2, t3, t4),
        stratum: packet.stratum(),
        precision: packet.precision(),
        poll: packet.poll(),
        transmit_timestamp: packet.transmit_timestamp(),
        reference_id: packet.reference_id(),
    })
}

const FRACTION_SCALE: f64 = 4_294_967_296.0;

#[allow(clippy::cast_possible_wrap)]
fn signed_diff(a: u64, b: u64) -> i128 {
    i128::from(a.wrapping_sub(b) as i64)
}

/// `((T2 - T1) + (T3 - T4)) / 2` in seconds
#[allow(clippy::cast_precision_loss)]
fn offset_calculate(t1: u64, t2: u64, t3: u64, t4: u64) -> f64 {
    let theta = signed_diff(t2, t1) + signed_diff(t3, t4);

    theta as f64 / 2.0 / FRACTION_SCALE
}

/// `(T4 - T1) - (T3 - T2)` in seconds
#[allow(clippy::cast_precision_loss)]
fn roundtrip_calculate(t1: u64, t2: u64, t3: u64, t4: u64) -> f64 {
    let delta = signed_diff(t4, t1) - signed_diff(t3, t2);

    delta as f64 / FRACTION_SCALE
}

impl<S> Client<S> {
    /// Shared context this client sends through
    pub fn context(&self) -> &NtpContext<S> {
        &self.context
    }
}

impl<S> fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
