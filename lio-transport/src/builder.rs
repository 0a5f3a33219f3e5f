use std::time::Duration;

use tracing::debug;

use crate::address::{Address, Family};
use crate::error::Result;
use crate::options::SocketOption;
use crate::socket::{Socket, SocketType};

/// Options and flags which can be used to configure how a socket is
/// created.
///
/// Options left unset keep the platform default. [`build`](Self::build)
/// applies the set ones in a fixed order, with anything that affects
/// binding (`reuse_address`, `ipv6_only`) before the bind itself.
///
/// ```rust,no_run
/// use lio_transport::{Address, Family, SocketBuilder};
///
/// # fn main() -> lio_transport::Result<()> {
/// let socket = SocketBuilder::datagram(Family::V4)
///   .nonblocking(true)
///   .broadcast(true)
///   .recv_buffer(256 * 1024)
///   .bind(Address::ANY_V4.with_port(7777))
///   .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SocketBuilder {
  ty: SocketType,
  family: Family,
  nonblocking: Option<bool>,
  broadcast: Option<bool>,
  reuse_address: Option<bool>,
  recv_buffer: Option<i32>,
  send_buffer: Option<i32>,
  recv_timeout: Option<Duration>,
  send_timeout: Option<Duration>,
  no_delay: Option<bool>,
  ipv6_only: Option<bool>,
  ttl: Option<i32>,
  bind: Option<Address>,
}

impl SocketBuilder {
  /// Creates a blank new set of options for a socket of the given type and
  /// family.
  #[must_use]
  pub const fn new(ty: SocketType, family: Family) -> Self {
    Self {
      ty,
      family,
      nonblocking: None,
      broadcast: None,
      reuse_address: None,
      recv_buffer: None,
      send_buffer: None,
      recv_timeout: None,
      send_timeout: None,
      no_delay: None,
      ipv6_only: None,
      ttl: None,
      bind: None,
    }
  }

  #[must_use]
  pub const fn datagram(family: Family) -> Self {
    Self::new(SocketType::Datagram, family)
  }

  #[must_use]
  pub const fn stream(family: Family) -> Self {
    Self::new(SocketType::Stream, family)
  }

  #[must_use]
  pub const fn nonblocking(mut self, nonblocking: bool) -> Self {
    self.nonblocking = Some(nonblocking);
    self
  }

  #[must_use]
  pub const fn broadcast(mut self, broadcast: bool) -> Self {
    self.broadcast = Some(broadcast);
    self
  }

  /// Allows binding to an address still held by another socket or in
  /// `TIME_WAIT`.
  #[must_use]
  pub const fn reuse_address(mut self, reuse: bool) -> Self {
    self.reuse_address = Some(reuse);
    self
  }

  /// Sets the kernel receive buffer size, in bytes.
  #[must_use]
  pub const fn recv_buffer(mut self, bytes: i32) -> Self {
    self.recv_buffer = Some(bytes);
    self
  }

  /// Sets the kernel send buffer size, in bytes.
  #[must_use]
  pub const fn send_buffer(mut self, bytes: i32) -> Self {
    self.send_buffer = Some(bytes);
    self
  }

  /// Sets how long a blocking receive may wait. Millisecond precision;
  /// `Duration::ZERO` waits forever.
  #[must_use]
  pub const fn recv_timeout(mut self, timeout: Duration) -> Self {
    self.recv_timeout = Some(timeout);
    self
  }

  /// Sets how long a blocking send may wait. Millisecond precision;
  /// `Duration::ZERO` waits forever.
  #[must_use]
  pub const fn send_timeout(mut self, timeout: Duration) -> Self {
    self.send_timeout = Some(timeout);
    self
  }

  /// Disables Nagle's algorithm. Stream sockets only.
  #[must_use]
  pub const fn no_delay(mut self, no_delay: bool) -> Self {
    self.no_delay = Some(no_delay);
    self
  }

  /// Restricts an IPv6 socket to IPv6 traffic. IPv6 sockets only.
  #[must_use]
  pub const fn ipv6_only(mut self, only: bool) -> Self {
    self.ipv6_only = Some(only);
    self
  }

  #[must_use]
  pub const fn ttl(mut self, ttl: i32) -> Self {
    self.ttl = Some(ttl);
    self
  }

  /// Binds the socket to `address` once every option has been applied.
  #[must_use]
  pub const fn bind(mut self, address: Address) -> Self {
    self.bind = Some(address);
    self
  }

  /// Creates the socket and applies the options specified by `self`.
  ///
  /// # Errors
  ///
  /// The first error from socket creation, any option, or the bind. The
  /// partly configured socket is closed before the error is returned.
  pub fn build(&self) -> Result<Socket> {
    let socket = Socket::new(self.ty, self.family)?;

    let flags = [
      (SocketOption::NonBlock, self.nonblocking),
      (SocketOption::ReuseAddr, self.reuse_address),
      (SocketOption::Ipv6Only, self.ipv6_only),
      (SocketOption::Broadcast, self.broadcast),
      (SocketOption::NoDelay, self.no_delay),
    ];
    for (option, value) in flags {
      if let Some(value) = value {
        socket.set_option(option, i32::from(value))?;
      }
    }

    let values = [
      (SocketOption::RecvBuffer, self.recv_buffer),
      (SocketOption::SendBuffer, self.send_buffer),
      (SocketOption::RecvTimeout, self.recv_timeout.map(duration_to_millis)),
      (SocketOption::SendTimeout, self.send_timeout.map(duration_to_millis)),
      (SocketOption::Ttl, self.ttl),
    ];
    for (option, value) in values {
      if let Some(value) = value {
        socket.set_option(option, value)?;
      }
    }

    if let Some(address) = &self.bind {
      socket.bind(address)?;
    }

    debug!(builder = ?self, "socket built");
    Ok(socket)
  }
}

fn duration_to_millis(duration: Duration) -> i32 {
  duration.as_millis().min(i32::MAX as u128) as i32
}
