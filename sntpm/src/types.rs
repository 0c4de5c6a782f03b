use core::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::packet::{KissCode, Mode, NtpTimestamp, ReferenceId};
use crate::time::{StdTimeSource, TimeSource};
use crate::transport::Transport;

/// Error domain reported alongside [`ErrorKind`] codes
pub const ERROR_DOMAIN: &str = "sntpm.client";

/// Crate-wide result alias
pub type Result<T> = core::result::Result<T, Error>;

/// Packet decoding failure
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer than 48 bytes were supplied
    #[error("NTP packet too short: {len} bytes")]
    TooShort { len: usize },
}

/// Reasons a reply is rejected by the client
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidResponse {
    /// Payload size of a response does not meet the `SNTPv4` header size
    #[error("payload shorter than an NTP header")]
    TooShort,
    /// Only version 4 replies are accepted
    #[error("unsupported NTP version {0}")]
    UnsupportedVersion(u8),
    #[error("unexpected mode {0:?}")]
    UnexpectedMode(Mode),
    /// Stratum above 15
    #[error("invalid stratum {0}")]
    InvalidStratum(u8),
    #[error("server transmit timestamp is zero")]
    ZeroTransmitTimestamp,
    /// Origin timestamp of a response differs from the transmit timestamp
    /// of the request
    #[error("originate timestamp does not match the request")]
    OriginateMismatch,
    #[error("server receive timestamp precedes the originate timestamp")]
    ReceiveBeforeOriginate,
}

impl From<DecodeError> for InvalidResponse {
    fn from(_: DecodeError) -> Self {
        InvalidResponse::TooShort
    }
}

/// Query failure reported by [`Client::query_time`](crate::Client::query_time)
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A reply was received but failed validation
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] InvalidResponse),
    /// No valid reply arrived before the deadline
    #[error("request timed out")]
    Timeout,
    /// Kiss-o'-Death `RATE`
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    /// Kiss-o'-Death `DENY`, `RSTR` or an unknown code
    #[error("access denied by server ({0})")]
    AccessDenied(KissCode),
    /// Sending or receiving a datagram failed
    #[error("network error")]
    Network,
    /// The server host name cannot be resolved
    #[error("server address cannot be resolved")]
    AddressResolve,
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::InvalidResponse(err.into())
    }
}

/// Stable numeric error codes within [`ERROR_DOMAIN`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorKind {
    Network = 0,
    Timeout = 1,
    InvalidResponse = 2,
    AccessDenied = 3,
    RateLimitExceeded = 4,
    AddressResolve = 5,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Error::Timeout => ErrorKind::Timeout,
            Error::RateLimitExceeded => ErrorKind::RateLimitExceeded,
            Error::AccessDenied(_) => ErrorKind::AccessDenied,
            Error::Network => ErrorKind::Network,
            Error::AddressResolve => ErrorKind::AddressResolve,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }

    #[must_use]
    pub fn code(&self) -> i32 {
        self.kind() as i32
    }

    /// Fatal errors stop automatic retries
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AccessDenied(_))
    }
}

/// Collaborators shared by clients and managers: the socket every request
/// goes through and the local clock
pub struct NtpContext<S> {
    pub transport: Arc<Transport<S>>,
    pub clock: Arc<dyn TimeSource>,
}

impl<S> NtpContext<S> {
    /// Create SNTP client context around `socket` using the system clock
    pub fn new(socket: S) -> Self {
        NtpContext::with_clock(socket, Arc::new(StdTimeSource))
    }

    pub fn with_clock(socket: S, clock: Arc<dyn TimeSource>) -> Self {
        NtpContext {
            transport: Arc::new(Transport::new(socket)),
            clock,
        }
    }
}

impl<S> Clone for NtpContext<S> {
    fn clone(&self) -> Self {
        NtpContext {
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Result of a successful SNTP exchange
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NtpResult {
    /// Estimated difference between the server and the local clock in seconds
    pub offset: f64,
    /// Request roundtrip time in seconds
    pub roundtrip: f64,
    /// Clock stratum of NTP server
    pub stratum: u8,
    /// Precision of NTP server as log2(seconds)
    pub precision: i8,
    /// Poll exponent advertised by the server
    pub poll: i8,
    pub transmit_timestamp: NtpTimestamp,
    pub reference_id: ReferenceId,
}

impl NtpResult {
    /// Returns system clock offset value in seconds
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns request's roundtrip time (client -> server -> client) in seconds
    #[must_use]
    pub fn roundtrip(&self) -> f64 {
        self.roundtrip
    }

    /// Returns reported stratum value (level of server's hierarchy to stratum 0 - "reference clock")
    #[must_use]
    pub fn stratum(&self) -> u8 {
        self.stratum
    }

    /// Returns reported precision value (an exponent of two, which results in the precision of server's system clock in seconds)
    #[must_use]
    pub fn precision(&self) -> i8 {
        self.precision
    }

    #[must_use]
    pub fn poll(&self) -> i8 {
        self.poll
    }

    /// Server time at which the reply left the server
    #[must_use]
    pub fn transmit_timestamp(&self) -> NtpTimestamp {
        self.transmit_timestamp
    }

    #[must_use]
    pub fn reference_id(&self) -> ReferenceId {
        self.reference_id
    }
}

/// Earliest time the next request to a server may be sent
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RequestWindow {
    /// Seconds since the NTP epoch, in the local time scale
    At(f64),
    /// Never retry automatically
    DistantFuture,
}

impl RequestWindow {
    /// The window time, `None` for [`RequestWindow::DistantFuture`]
    #[must_use]
    pub fn at(&self) -> Option<f64> {
        match self {
            RequestWindow::At(at) => Some(*at),
            RequestWindow::DistantFuture => None,
        }
    }

    #[must_use]
    pub fn is_distant_future(&self) -> bool {
        matches!(self, RequestWindow::DistantFuture)
    }
}

impl Display for RequestWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RequestWindow::At(at) => write!(f, "{at:.3}"),
            RequestWindow::DistantFuture => f.write_str("distant future"),
        }
    }
}

/// Completion value of a single query
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QueryOutcome {
    pub result: Result<NtpResult>,
    pub next_request_window: RequestWindow,
    /// Local time the request was sent (or attempted), seconds since the NTP
    /// epoch
    pub request_date: f64,
}

impl QueryOutcome {
    /// Measured offset, 0 if the query failed
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.result.as_ref().map_or(0.0, NtpResult::offset)
    }

    #[must_use]
    pub fn error(&self) -> Option<Error> {
        self.result.err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Network.code(), 0);
        assert_eq!(Error::Timeout.code(), 1);
        assert_eq!(
            Error::InvalidResponse(InvalidResponse::TooShort).code(),
            2
        );
        assert_eq!(Error::AccessDenied(KissCode::Deny).code(), 3);
        assert_eq!(Error::RateLimitExceeded.code(), 4);
        assert_eq!(Error::AddressResolve.code(), 5);
        assert_eq!(Error::Timeout.domain(), "sntpm.client");
    }

    #[test]
    fn test_only_access_denied_is_fatal() {
        assert!(Error::AccessDenied(KissCode::Restricted).is_fatal());
        assert!(!Error::RateLimitExceeded.is_fatal());
        assert!(!Error::Timeout.is_fatal());
    }

    #[test]
    fn test_decode_error_promotion() {
        let err: Error = DecodeError::TooShort { len: 3 }.into();

        assert_eq!(err, Error::InvalidResponse(InvalidResponse::TooShort));
        assert_eq!(
            err.to_string(),
            "invalid response: payload shorter than an NTP header"
        );
    }

    #[test]
    fn test_outcome_offset_on_error() {
        let outcome = QueryOutcome {
            result: Err(Error::Timeout),
            next_request_window: RequestWindow::At(15.0),
            request_date: 0.0,
        };

        assert_eq!(outcome.offset(), 0.0);
        assert_eq!(outcome.error(), Some(Error::Timeout));
        assert_eq!(outcome.next_request_window.at(), Some(15.0));
    }
}
