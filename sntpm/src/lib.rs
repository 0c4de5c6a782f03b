//! Rust SNTP client with a multi-server poll manager
//!
//! # Overview
//!
//! This crate sends requests to NTP servers, validates their replies and
//! computes the local clock offset. Supported SNTP protocol versions:
//! - [SNTPv4](https://datatracker.ietf.org/doc/html/rfc4330)
//!
//! It is built from three layers:
//! - [`packet`]: the 48 byte wire format and its fixed-point time formats;
//! - [`Client`]: queries one server, at most one request in flight, and
//!   reports the offset together with the earliest time the server may be
//!   asked again (honoring the server poll interval, a 15 s minimum and
//!   Kiss-o'-Death replies);
//! - [`Manager`]: keeps a set of clients polling in the background and
//!   combines their offsets into one system clock offset.
//!
//! # Usage
//!
//! Put this in your `Cargo.toml`:
//! ```cargo
//! [dependencies]
//! sntpm = "0.1"
//! sntpm-net-tokio = "0.1"
//! ```
//!
//! ## Features
//!
//! - `log` (default): library debug output through the `log` facade.
//!   Requests, accepted replies and scheduling decisions are logged at debug
//!   level, rejected replies at warn level, packet dumps at trace level.
//!
//! # Details
//!
//! The network is abstracted by the [`NtpUdpSocket`] trait and the local
//! clock by [`TimeSource`]. Both are bundled in an [`NtpContext`], which can
//! be shared by any number of clients: replies are routed to the query they
//! answer by their originate timestamp.
//!
//! # Example
//!
//! ```ignore
//! use sntpm::{Client, ClientEndpoint, Manager, NtpContext};
//! use sntpm_net_tokio::UdpSocketWrapper;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let socket = UdpSocketWrapper::bind("0.0.0.0:0").await?;
//!     let context = NtpContext::new(socket);
//!
//!     let client = Client::new(ClientEndpoint::with_default_port("time.apple.com"), context.clone());
//!     let outcome = client.query_time().await;
//!     println!("offset: {} s, next query after {}", outcome.offset(), outcome.next_request_window);
//!
//!     let manager = Manager::new(context);
//!     manager.add_well_known_servers();
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     println!("system clock offset: {} s", manager.system_clock_offset());
//!
//!     Ok(())
//! }
//! ```

mod client;
pub mod config;
mod log;
mod manager;
pub mod packet;
mod socket;
pub mod time;
mod transport;
mod types;

pub use crate::client::{process_response, Client, ClientEndpoint, ParseEndpointError};
pub use crate::manager::{Manager, ManagerEntry};
pub use crate::packet::{
    KissCode, LeapIndicator, Mode, NtpShort, NtpTimestamp, PacketBuilder, PacketFields,
    RawNtpPacket, ReceivedPacket, ReferenceId,
};
pub use crate::socket::NtpUdpSocket;
pub use crate::time::{StdTimeSource, TimeSource};
pub use crate::transport::Transport;
pub use crate::types::{
    DecodeError, Error, ErrorKind, InvalidResponse, NtpContext, NtpResult, QueryOutcome,
    RequestWindow, Result, ERROR_DOMAIN,
};
