//! NTP packet codec
//!
//! Pure conversions between the 48 byte NTP header on the wire and its
//! structured form, plus the fixed-point time formats used in it. Nothing in
//! this module performs I/O or keeps state.
//!
//! A packet exists in two roles:
//! - [`ReceivedPacket`] is an immutable view over bytes received from the
//!   network;
//! - [`PacketBuilder`] is a mutable field set used to construct requests (and
//!   synthetic replies in tests).
//!
//! Both expose their fields through the [`PacketFields`] trait.
use core::fmt::{self, Display, Formatter};
use core::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::log::trace;
use crate::types::DecodeError;

/// Size of an NTP header without extension fields
pub const NTP_PACKET_SIZE: usize = 48;
/// Seconds between the NTP epoch (1900-01-01) and the UNIX epoch (1970-01-01)
/// <https://www.rfc-editor.org/rfc/rfc5905>
pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;
/// NTP version spoken by this client
pub const NTP_VERSION: u8 = 4;

/// LI (leap indicator) bit mask
pub(crate) const LI_MASK: u8 = 0b1100_0000;
/// LI bit mask shift value
pub(crate) const LI_SHIFT: u8 = 6;
/// Version bit mask
pub(crate) const VERSION_MASK: u8 = 0b0011_1000;
/// Version bit mask shift value
pub(crate) const VERSION_SHIFT: u8 = 3;
/// Mode bit mask
pub(crate) const MODE_MASK: u8 = 0b0000_0111;
/// Mode bit mask shift value
pub(crate) const MODE_SHIFT: u8 = 0;
/// Seconds mask of a 32.32 timestamp
pub(crate) const SECONDS_MASK: u64 = 0xffff_ffff_0000_0000;
/// Seconds fraction mask of a 32.32 timestamp
pub(crate) const SECONDS_FRAC_MASK: u64 = 0xffff_ffff;

const TIMESTAMP_SCALE: f64 = 4_294_967_296.0;
const SHORT_SCALE: f64 = 65_536.0;

/// A point in time in NTP 32.32 fixed-point format, seconds since
/// 1900-01-01T00:00:00Z.
///
/// Ordering is the raw numeric ordering of the 64-bit value; use
/// [`NtpTimestamp::seconds_since`] for era-safe differences.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NtpTimestamp(u64);

impl NtpTimestamp {
    /// The all-zero timestamp, meaning "unknown" on the wire
    pub const ZERO: NtpTimestamp = NtpTimestamp(0);

    /// Creates a timestamp from integer seconds and a 2^-32 fraction
    #[must_use]
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp(((seconds as u64) << 32) | fraction as u64)
    }

    /// Creates a timestamp from its raw 64-bit representation
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        NtpTimestamp(bits)
    }

    /// Returns the raw 64-bit representation
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Integer seconds part
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub const fn seconds(self) -> u32 {
        ((self.0 & SECONDS_MASK) >> 32) as u32
    }

    /// Fractional part in units of 2^-32 s
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub const fn fraction(self) -> u32 {
        (self.0 & SECONDS_FRAC_MASK) as u32
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Seconds since the NTP epoch as a floating point value
    #[must_use]
    pub fn to_seconds(self) -> f64 {
        f64::from(self.seconds()) + f64::from(self.fraction()) / TIMESTAMP_SCALE
    }

    /// Converts floating seconds since the NTP epoch into a timestamp.
    ///
    /// The fraction is rounded to the nearest 2^-32 s. Values outside of the
    /// first NTP era wrap around modulo 2^32 seconds instead of failing.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        if !seconds.is_finite() {
            return NtpTimestamp::ZERO;
        }

        let whole = seconds.floor();
        let mut fraction = ((seconds - whole) * TIMESTAMP_SCALE).round();
        let mut whole = whole as i64;

        if fraction >= TIMESTAMP_SCALE {
            whole = whole.wrapping_add(1);
            fraction = 0.0;
        }

        NtpTimestamp::new(whole as u32, fraction as u32)
    }

    /// Signed number of seconds from `earlier` to `self`.
    ///
    /// Computed on the raw values with wrapping arithmetic, so the result is
    /// correct across an era boundary as long as both points are less than
    /// 68 years apart.
    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    #[must_use]
    pub fn seconds_since(self, earlier: NtpTimestamp) -> f64 {
        self.0.wrapping_sub(earlier.0) as i64 as f64 / TIMESTAMP_SCALE
    }

    /// Calendar time of this timestamp, assuming NTP era 0
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let unix = i64::from(self.seconds()) - i64::from(NTP_UNIX_OFFSET);
        let nanos = (u64::from(self.fraction()) * 1_000_000_000) >> 32;

        DateTime::from_timestamp(unix, u32::try_from(nanos).ok()?)
    }

    /// Timestamp of a calendar time
    #[must_use]
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        let seconds = time.timestamp().wrapping_add(i64::from(NTP_UNIX_OFFSET));
        let fraction =
            (u64::from(time.timestamp_subsec_nanos()) << 32) / 1_000_000_000;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        NtpTimestamp::new(seconds as u32, fraction as u32)
    }
}

impl Display for NtpTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:010}", self.seconds(), self.fraction())
    }
}

/// NTP short format: 16.16 fixed-point seconds, integer part signed
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NtpShort(u32);

impl NtpShort {
    pub const ZERO: NtpShort = NtpShort(0);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        NtpShort(bits)
    }

    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn to_seconds(self) -> f64 {
        f64::from(self.0 as i32) / SHORT_SCALE
    }

    /// Converts seconds into the short format, rounding to 2^-16 s and
    /// saturating outside of ±32768 s.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        NtpShort((seconds * SHORT_SCALE).round() as i32 as u32)
    }
}

/// Converts an NTP timestamp to seconds since the NTP epoch
#[must_use]
pub fn timestamp_to_seconds(timestamp: NtpTimestamp) -> f64 {
    timestamp.to_seconds()
}

/// Converts seconds since the NTP epoch to an NTP timestamp
#[must_use]
pub fn seconds_to_timestamp(seconds: f64) -> NtpTimestamp {
    NtpTimestamp::from_seconds(seconds)
}

/// Converts an NTP short value to seconds
#[must_use]
pub fn short_to_seconds(value: NtpShort) -> f64 {
    value.to_seconds()
}

/// Converts seconds to an NTP short value
#[must_use]
pub fn seconds_to_short(seconds: f64) -> NtpShort {
    NtpShort::from_seconds(seconds)
}

/// Warning of an impending leap second in the last minute of the day
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LeapIndicator {
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds
    LeapAdd = 1,
    /// Last minute of the day has 59 seconds
    LeapSub = 2,
    /// Clock not synchronized
    Unsynchronized = 3,
}

impl From<u8> for LeapIndicator {
    /// Only the two low bits are significant
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::LeapAdd,
            2 => LeapIndicator::LeapSub,
            _ => LeapIndicator::Unsynchronized,
        }
    }
}

/// Association mode
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Reserved = 0,
    SymmetricActive = 1,
    SymmetricPassive = 2,
    /// Requests sent by a client
    Client = 3,
    /// Replies sent by a server
    Server = 4,
    Broadcast = 5,
    Control = 6,
    Private = 7,
}

impl From<u8> for Mode {
    /// Only the three low bits are significant
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            _ => Mode::Private,
        }
    }
}

/// Reference identifier: a four character code for stratum 0 and 1, the
/// IPv4 address of the upstream server for secondary servers.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceId([u8; 4]);

impl ReferenceId {
    /// Uncalibrated local clock
    pub const LOCL: ReferenceId = ReferenceId(*b"LOCL");
    /// Calibrated Cesium clock
    pub const CESM: ReferenceId = ReferenceId(*b"CESM");
    /// Calibrated Rubidium clock
    pub const RBDM: ReferenceId = ReferenceId(*b"RBDM");
    /// Calibrated quartz clock or other pulse-per-second source
    pub const PPS: ReferenceId = ReferenceId(*b"PPS\0");
    /// DCF77 longwave time signal
    pub const DCF: ReferenceId = ReferenceId(*b"DCF\0");
    /// Global Positioning Service
    pub const GPS: ReferenceId = ReferenceId(*b"GPS\0");
    /// Global Positioning Service with shared access
    pub const GPSS: ReferenceId = ReferenceId(*b"GPSs");
    /// GLONASS with shared access
    pub const GLNS: ReferenceId = ReferenceId(*b"GLNs");
    /// Kiss code: access denied by the server
    pub const DENY: ReferenceId = ReferenceId(*b"DENY");
    /// Kiss code: access denied due to local policy
    pub const RSTR: ReferenceId = ReferenceId(*b"RSTR");
    /// Kiss code: rate exceeded
    pub const RATE: ReferenceId = ReferenceId(*b"RATE");

    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        ReferenceId(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The identifier as ASCII text, padding NULs stripped. `None` if the
    /// bytes are not printable ASCII.
    #[must_use]
    pub fn as_ascii(&self) -> Option<&str> {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        let code = &self.0[..len];

        if code.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            core::str::from_utf8(code).ok()
        } else {
            None
        }
    }

    /// The identifier interpreted as an IPv4 address
    #[must_use]
    pub fn as_ipv4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0)
    }
}

impl Display for ReferenceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.as_ascii() {
            Some(code) => f.write_str(code),
            None => write!(f, "{:02x?}", self.0),
        }
    }
}

/// Kiss-o'-Death code carried by a stratum 0 reply
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KissCode {
    /// `DENY`: the server asks the client to stop sending requests
    Deny,
    /// `RSTR`: access denied due to local policy, stop sending requests
    Restricted,
    /// `RATE`: the client has to reduce its request rate
    Rate,
    /// Any other code, treated like `DENY`
    Unknown(ReferenceId),
}

impl KissCode {
    /// Whether the server asked to stop querying altogether
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, KissCode::Rate)
    }
}

impl From<ReferenceId> for KissCode {
    fn from(id: ReferenceId) -> Self {
        match id {
            ReferenceId::DENY => KissCode::Deny,
            ReferenceId::RSTR => KissCode::Restricted,
            ReferenceId::RATE => KissCode::Rate,
            other => KissCode::Unknown(other),
        }
    }
}

impl Display for KissCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KissCode::Deny => f.write_str("DENY"),
            KissCode::Restricted => f.write_str("RSTR"),
            KissCode::Rate => f.write_str("RATE"),
            KissCode::Unknown(id) => write!(f, "unknown kiss code {id}"),
        }
    }
}

/// Read access to the fields of an NTP header
pub trait PacketFields {
    fn leap_indicator(&self) -> LeapIndicator;
    fn version(&self) -> u8;
    fn mode(&self) -> Mode;
    fn stratum(&self) -> u8;
    /// Poll interval as a power of two exponent
    fn poll(&self) -> i8;
    /// Clock precision as a power of two exponent
    fn precision(&self) -> i8;
    fn root_delay(&self) -> NtpShort;
    fn root_dispersion(&self) -> NtpShort;
    fn reference_id(&self) -> ReferenceId;
    fn reference_timestamp(&self) -> NtpTimestamp;
    fn originate_timestamp(&self) -> NtpTimestamp;
    fn receive_timestamp(&self) -> NtpTimestamp;
    fn transmit_timestamp(&self) -> NtpTimestamp;

    /// Poll interval in seconds
    fn poll_interval(&self) -> f64 {
        2f64.powi(i32::from(self.poll()))
    }

    /// Clock precision in seconds
    fn precision_seconds(&self) -> f64 {
        2f64.powi(i32::from(self.precision()))
    }

    /// The Kiss-o'-Death code if this is a stratum 0 packet
    fn kiss_code(&self) -> Option<KissCode> {
        (self.stratum() == 0).then(|| KissCode::from(self.reference_id()))
    }
}

/// Raw NTP header bytes in network order
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawNtpPacket(pub [u8; NTP_PACKET_SIZE]);

impl Default for RawNtpPacket {
    fn default() -> Self {
        RawNtpPacket([0u8; NTP_PACKET_SIZE])
    }
}

impl AsRef<[u8]> for RawNtpPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl RawNtpPacket {
    fn u32_at(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_be_bytes(buf)
    }

    fn u64_at(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[offset..offset + 8]);
        u64::from_be_bytes(buf)
    }
}

/// Offset of the originate timestamp in the header
pub(crate) const ORIGINATE_OFFSET: usize = 24;

/// Reads the originate timestamp of a datagram without decoding it
pub(crate) fn peek_originate(bytes: &[u8]) -> Option<NtpTimestamp> {
    let raw = bytes.get(ORIGINATE_OFFSET..ORIGINATE_OFFSET + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(raw);

    Some(NtpTimestamp::from_bits(u64::from_be_bytes(buf)))
}

/// A packet received from the network. Fields are read from the raw bytes
/// on access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    raw: RawNtpPacket,
}

impl ReceivedPacket {
    /// Decodes the first 48 bytes of `bytes`. Trailing bytes (extension
    /// fields, MAC) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TooShort`] if fewer than 48 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let header = bytes
            .get(..NTP_PACKET_SIZE)
            .ok_or(DecodeError::TooShort { len: bytes.len() })?;
        let mut raw = RawNtpPacket::default();
        raw.0.copy_from_slice(header);

        Ok(ReceivedPacket { raw })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NTP_PACKET_SIZE] {
        &self.raw.0
    }

    /// A mutable copy of this packet
    #[must_use]
    pub fn to_builder(&self) -> PacketBuilder {
        PacketBuilder::from(self)
    }

    pub(crate) fn trace_dump(&self, destination: NtpTimestamp) {
        let delimiter = "=".repeat(64);

        trace!("{}", delimiter);
        trace!("| Mode:\t\t{:?}", self.mode());
        trace!("| Version:\t{}", self.version());
        trace!("| Leap:\t\t{:?}", self.leap_indicator());
        trace!("| Stratum:\t{}", self.stratum());
        trace!("| Poll:\t\t{}", self.poll());
        trace!("| Precision:\t\t{}", self.precision());
        trace!("| Root delay:\t\t{}", self.root_delay().to_seconds());
        trace!("| Root dispersion:\t{}", self.root_dispersion().to_seconds());
        trace!("| Reference ID:\t\t{}", self.reference_id());
        trace!(
            "| Originate timestamp   (client):\t{}",
            self.originate_timestamp()
        );
        trace!(
            "| Receive timestamp     (server):\t{}",
            self.receive_timestamp()
        );
        trace!(
            "| Transmit timestamp    (server):\t{}",
            self.transmit_timestamp()
        );
        trace!("| Destination timestamp (client):\t{}", destination);
        trace!(
            "| Reference timestamp   (server):\t{}",
            self.reference_timestamp()
        );
        trace!("{}", delimiter);
    }
}

fn shifter(val: u8, mask: u8, shift: u8) -> u8 {
    (val & mask) >> shift
}

impl PacketFields for ReceivedPacket {
    fn leap_indicator(&self) -> LeapIndicator {
        LeapIndicator::from(shifter(self.raw.0[0], LI_MASK, LI_SHIFT))
    }

    fn version(&self) -> u8 {
        shifter(self.raw.0[0], VERSION_MASK, VERSION_SHIFT)
    }

    fn mode(&self) -> Mode {
        Mode::from(shifter(self.raw.0[0], MODE_MASK, MODE_SHIFT))
    }

    fn stratum(&self) -> u8 {
        self.raw.0[1]
    }

    #[allow(clippy::cast_possible_wrap)]
    fn poll(&self) -> i8 {
        self.raw.0[2] as i8
    }

    #[allow(clippy::cast_possible_wrap)]
    fn precision(&self) -> i8 {
        self.raw.0[3] as i8
    }

    fn root_delay(&self) -> NtpShort {
        NtpShort::from_bits(self.raw.u32_at(4))
    }

    fn root_dispersion(&self) -> NtpShort {
        NtpShort::from_bits(self.raw.u32_at(8))
    }

    fn reference_id(&self) -> ReferenceId {
        ReferenceId::new(self.raw.u32_at(12).to_be_bytes())
    }

    fn reference_timestamp(&self) -> NtpTimestamp {
        NtpTimestamp::from_bits(self.raw.u64_at(16))
    }

    fn originate_timestamp(&self) -> NtpTimestamp {
        NtpTimestamp::from_bits(self.raw.u64_at(ORIGINATE_OFFSET))
    }

    fn receive_timestamp(&self) -> NtpTimestamp {
        NtpTimestamp::from_bits(self.raw.u64_at(32))
    }

    fn transmit_timestamp(&self) -> NtpTimestamp {
        NtpTimestamp::from_bits(self.raw.u64_at(40))
    }
}

/// Mutable NTP packet used to build requests and replies.
///
/// `version` keeps only its three low bits when encoded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PacketBuilder {
    leap_indicator: LeapIndicator,
    version: u8,
    mode: Mode,
    stratum: u8,
    poll: i8,
    precision: i8,
    root_delay: NtpShort,
    root_dispersion: NtpShort,
    reference_id: ReferenceId,
    reference_timestamp: NtpTimestamp,
    originate_timestamp: NtpTimestamp,
    receive_timestamp: NtpTimestamp,
    transmit_timestamp: NtpTimestamp,
}

impl PacketBuilder {
    /// An all-zero packet
    #[must_use]
    pub fn new() -> Self {
        PacketBuilder::default()
    }

    /// A version 4 client request stamped with `transmit`
    #[must_use]
    pub fn client_request(transmit: NtpTimestamp) -> Self {
        PacketBuilder::new()
            .with_version(NTP_VERSION)
            .with_mode(Mode::Client)
            .with_transmit_timestamp(transmit)
    }

    #[must_use]
    pub fn with_leap_indicator(mut self, leap_indicator: LeapIndicator) -> Self {
        self.leap_indicator = leap_indicator;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_stratum(mut self, stratum: u8) -> Self {
        self.stratum = stratum;
        self
    }

    #[must_use]
    pub fn with_poll(mut self, poll: i8) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: i8) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_root_delay(mut self, root_delay: NtpShort) -> Self {
        self.root_delay = root_delay;
        self
    }

    #[must_use]
    pub fn with_root_dispersion(mut self, root_dispersion: NtpShort) -> Self {
        self.root_dispersion = root_dispersion;
        self
    }

    #[must_use]
    pub fn with_reference_id(mut self, reference_id: ReferenceId) -> Self {
        self.reference_id = reference_id;
        self
    }

    #[must_use]
    pub fn with_reference_timestamp(mut self, timestamp: NtpTimestamp) -> Self {
        self.reference_timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_originate_timestamp(mut self, timestamp: NtpTimestamp) -> Self {
        self.originate_timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_receive_timestamp(mut self, timestamp: NtpTimestamp) -> Self {
        self.receive_timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_transmit_timestamp(mut self, timestamp: NtpTimestamp) -> Self {
        self.transmit_timestamp = timestamp;
        self
    }

    /// Encodes the packet into its 48 byte wire representation
    #[must_use]
    pub fn encode(&self) -> RawNtpPacket {
        let mut buf = [0u8; NTP_PACKET_SIZE];

        buf[0] = ((self.leap_indicator as u8) << LI_SHIFT) & LI_MASK
            | (self.version << VERSION_SHIFT) & VERSION_MASK
            | ((self.mode as u8) << MODE_SHIFT) & MODE_MASK;
        buf[1] = self.stratum;
        buf[2] = self.poll.to_be_bytes()[0];
        buf[3] = self.precision.to_be_bytes()[0];
        buf[4..8].copy_from_slice(&self.root_delay.to_bits().to_be_bytes());
        buf[8..12].copy_from_slice(&self.root_dispersion.to_bits().to_be_bytes());
        buf[12..16].copy_from_slice(self.reference_id.as_bytes());
        buf[16..24].copy_from_slice(&self.reference_timestamp.to_bits().to_be_bytes());
        buf[24..32].copy_from_slice(&self.originate_timestamp.to_bits().to_be_bytes());
        buf[32..40].copy_from_slice(&self.receive_timestamp.to_bits().to_be_bytes());
        buf[40..48].copy_from_slice(&self.transmit_timestamp.to_bits().to_be_bytes());

        RawNtpPacket(buf)
    }
}

impl From<&ReceivedPacket> for PacketBuilder {
    fn from(packet: &ReceivedPacket) -> Self {
        PacketBuilder {
            leap_indicator: packet.leap_indicator(),
            version: packet.version(),
            mode: packet.mode(),
            stratum: packet.stratum(),
            poll: packet.poll(),
            precision: packet.precision(),
            root_delay: packet.root_delay(),
            root_dispersion: packet.root_dispersion(),
            reference_id: packet.reference_id(),
            reference_timestamp: packet.reference_timestamp(),
            originate_timestamp: packet.originate_timestamp(),
            receive_timestamp: packet.receive_timestamp(),
            transmit_timestamp: packet.transmit_timestamp(),
        }
    }
}

impl PacketFields for PacketBuilder {
    fn leap_indicator(&self) -> LeapIndicator {
        self.leap_indicator
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn stratum(&self) -> u8 {
        self.stratum
    }

    fn poll(&self) -> i8 {
        self.poll
    }

    fn precision(&self) -> i8 {
        self.precision
    }

    fn root_delay(&self) -> NtpShort {
        self.root_delay
    }

    fn root_dispersion(&self) -> NtpShort {
        self.root_dispersion
    }

    fn reference_id(&self) -> ReferenceId {
        self.reference_id
    }

    fn reference_timestamp(&self) -> NtpTimestamp {
        self.reference_timestamp
    }

    fn originate_timestamp(&self) -> NtpTimestamp {
        self.originate_timestamp
    }

    fn receive_timestamp(&self) -> NtpTimestamp {
        self.receive_timestamp
    }

    fn transmit_timestamp(&self) -> NtpTimestamp {
        self.transmit_timestamp
    }
}

/// Encodes a packet into its wire representation
#[must_use]
pub fn encode(packet: &PacketBuilder) -> RawNtpPacket {
    packet.encode()
}

/// Decodes a packet from its wire representation
///
/// # Errors
///
/// Returns [`DecodeError::TooShort`] if fewer than 48 bytes are given.
pub fn decode(bytes: &[u8]) -> Result<ReceivedPacket, DecodeError> {
    ReceivedPacket::decode(bytes)
}
