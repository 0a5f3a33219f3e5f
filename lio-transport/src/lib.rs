#![cfg_attr(docsrs, feature(doc_cfg))]

//! # lio-transport - Synchronous Socket Layer
//!
//! `lio-transport` is the socket layer a reliable-UDP protocol engine sits on.
//! It gives one small, deterministic API over the platform's datagram and
//! stream sockets, and leaves sequencing, acknowledgement and retransmission
//! to the layer above.
//!
//! ## Features
//! - **Tagged addresses**: [`Address`] is an IPv4/IPv6 sum type whose port is
//!   always host order; byte swapping happens only at the OS boundary.
//! - **Scatter/gather datagrams**: [`Socket::send`] and [`Socket::receive`]
//!   take ordered slices of [`IoSlice`](std::io::IoSlice) /
//!   [`IoSliceMut`](std::io::IoSliceMut).
//! - **Cheap would-block**: a transfer that cannot proceed returns `Ok(0)`;
//!   a wait that times out returns an empty [`WaitCondition`].
//! - **Readiness waiting**: [`Socket::wait`] and [`select`] behind a
//!   [`ReadinessBackend`] chosen per platform (poll or select).
//!
//! ## Platform support
//!
//! | Platform   | Readiness backend | Resolver               |
//! |------------|-------------------|------------------------|
//! | Linux      | poll              | getaddrinfo            |
//! | macOS/iOS  | select            | getaddrinfo            |
//! | BSDs       | poll              | getaddrinfo            |
//! | Other Unix | poll              | numeric literals only  |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::io::{IoSlice, IoSliceMut};
//! use std::time::Duration;
//! use lio_transport::{Address, Family, Socket, SocketType, WaitCondition};
//!
//! fn example() -> lio_transport::Result<()> {
//!     let server = Socket::new(SocketType::Datagram, Family::V4)?;
//!     server.bind(&Address::parse("127.0.0.1", 0)?)?;
//!     let server_addr = server.local_address()?;
//!
//!     let client = Socket::new(SocketType::Datagram, Family::V4)?;
//!     client.send(Some(&server_addr), &[IoSlice::new(b"ping")])?;
//!
//!     let ready = server.wait(WaitCondition::RECEIVE, Duration::from_secs(1))?;
//!     if ready.contains(WaitCondition::RECEIVE) {
//!         let mut buf = [0u8; 1500];
//!         let mut from = Address::ANY_V4;
//!         let n = server.receive(Some(&mut from), &mut [IoSliceMut::new(&mut buf)])?;
//!         println!("{n} bytes from {from}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threading
//!
//! Nothing in this crate spawns threads or blocks outside of
//! [`Socket::wait`] and [`select`]. A [`Socket`] may be moved between
//! threads, but logically concurrent use of one socket must be serialised by
//! the caller.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Distinct OS failures are
//! never collapsed: the [`Error`] variant says which kind of operation failed
//! and the wrapped [`std::io::Error`] or resolver status says why.

#[cfg(not(unix))]
compile_error!("lio-transport only supports Unix targets");

#[macro_use]
mod macros;

pub mod address;
pub mod builder;
pub mod error;
mod net_utils;
pub mod options;
pub mod readiness;
pub mod resolve;
pub mod socket;
pub mod time;
pub mod transfer;

#[doc(hidden)]
pub mod test_utils;

pub use address::{Address, Family};
pub use builder::SocketBuilder;
pub use error::{Error, Result};
pub use options::SocketOption;
pub use readiness::{
  DefaultBackend, PollBackend, ReadinessBackend, SelectBackend, SocketSet,
  WaitCondition, select,
};
pub use resolve::{DefaultResolver, LiteralResolver, Resolver};
pub use socket::{Socket, SocketType};
pub use time::TimeBase;

#[cfg(has_getaddrinfo)]
pub use resolve::GaiResolver;
