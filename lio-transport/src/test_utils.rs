//! Test utilities for unit and integration tests.
//!
//! Every helper binds to loopback with an OS-assigned port, so tests can run
//! in parallel without colliding.

use std::io;

use crate::{Address, Error, Family, Result, Socket, SocketType};

/// Creates a UDP IPv4 socket bound to `127.0.0.1:0`.
#[doc(hidden)]
pub fn udp_socket() -> Result<Socket> {
  let socket = Socket::new(SocketType::Datagram, Family::V4)?;
  socket.bind(&Address::new_v4(std::net::Ipv4Addr::LOCALHOST, 0))?;
  Ok(socket)
}

/// Creates a UDP IPv6 socket bound to `[::1]:0`.
#[doc(hidden)]
pub fn udp6_socket() -> Result<Socket> {
  let socket = Socket::new(SocketType::Datagram, Family::V6)?;
  socket.bind(&Address::new_v6(std::net::Ipv6Addr::LOCALHOST, 0))?;
  Ok(socket)
}

/// Creates a listening TCP IPv4 socket on `127.0.0.1:0`.
///
/// Returns the listener and the address clients should connect to.
#[doc(hidden)]
pub fn tcp_listener() -> Result<(Socket, Address)> {
  let listener = Socket::new(SocketType::Stream, Family::V4)?;
  listener.bind(&Address::new_v4(std::net::Ipv4Addr::LOCALHOST, 0))?;
  listener.listen(-1)?;
  let address = listener.local_address()?;
  Ok((listener, address))
}

/// Creates a connected pair of blocking TCP IPv4 sockets, client first.
#[doc(hidden)]
pub fn connected_tcp_pair() -> Result<(Socket, Socket)> {
  let (listener, address) = tcp_listener()?;
  let client = Socket::new(SocketType::Stream, Family::V4)?;
  client.connect(&address)?;

  let (server, _) = listener
    .accept()?
    .ok_or_else(|| Error::Io(io::ErrorKind::WouldBlock.into()))?;
  Ok((client, server))
}
