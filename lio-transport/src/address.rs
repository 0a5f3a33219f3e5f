//! Endpoint addresses.
//!
//! [`Address`] is a plain value: an IPv4 or IPv6 host plus a port. The host
//! bytes are kept in network order (the order they are written in text) and
//! the port is kept in host order. Conversion to the OS `sockaddr` layout,
//! including the port byte swap, lives in one place and is applied to a
//! private copy whenever an address crosses into a system call.

use std::fmt;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::resolve::{DefaultResolver, Resolver};

/// Address family of a socket or an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  V4,
  V6,
}

impl Family {
  pub(crate) fn as_raw(self) -> libc::c_int {
    match self {
      Family::V4 => libc::AF_INET,
      Family::V6 => libc::AF_INET6,
    }
  }

  /// Size in bytes of the OS socket address structure for this family.
  pub fn wire_size(self) -> usize {
    match self {
      Family::V4 => mem::size_of::<libc::sockaddr_in>(),
      Family::V6 => mem::size_of::<libc::sockaddr_in6>(),
    }
  }
}

impl fmt::Display for Family {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Family::V4 => f.write_str("IPv4"),
      Family::V6 => f.write_str("IPv6"),
    }
  }
}

/// An IPv4 or IPv6 endpoint.
///
/// `port` is always host byte order. `scope_id` only matters for link-local
/// IPv6 addresses read back from the OS; it is zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
  V4 { host: [u8; 4], port: u16 },
  V6 { host: [u8; 16], port: u16, scope_id: u32 },
}

impl Address {
  /// `0.0.0.0:0`
  pub const ANY_V4: Address = Address::V4 { host: [0; 4], port: 0 };
  /// `255.255.255.255:0`
  pub const BROADCAST_V4: Address = Address::V4 { host: [255; 4], port: 0 };
  /// `[::]:0`
  pub const ANY_V6: Address =
    Address::V6 { host: [0; 16], port: 0, scope_id: 0 };

  pub const fn new_v4(host: Ipv4Addr, port: u16) -> Self {
    Address::V4 { host: host.octets(), port }
  }

  pub const fn new_v6(host: Ipv6Addr, port: u16) -> Self {
    Address::V6 { host: host.octets(), port, scope_id: 0 }
  }

  /// Parses a numeric host (`a.b.c.d` or IPv6 text) without consulting any
  /// resolver.
  ///
  /// # Errors
  ///
  /// Returns [`Error::Resolution`] with `EAI_NONAME` if `host` is not an
  /// address literal.
  pub fn parse(host: &str, port: u16) -> Result<Self> {
    host
      .parse::<IpAddr>()
      .map(|ip| Self::from_ip(ip, port))
      .map_err(|_| Error::resolution(libc::EAI_NONAME))
  }

  /// Resolves `hostname` through the platform's [`DefaultResolver`].
  ///
  /// Literal addresses are accepted as well. The first address the resolver
  /// returns is used, which on dual-stack hosts is often IPv6. `port` of
  /// `None` yields port `0`.
  pub fn resolve(hostname: &str, port: Option<u16>) -> Result<Self> {
    DefaultResolver::default().lookup_host(hostname, port)
  }

  /// Looks up a host name for this address, falling back to the numeric
  /// text when no name is registered for it.
  pub fn reverse_lookup(&self) -> Result<String> {
    DefaultResolver::default().lookup_name(self)
  }

  pub fn from_ip(ip: IpAddr, port: u16) -> Self {
    match ip {
      IpAddr::V4(v4) => Self::new_v4(v4, port),
      IpAddr::V6(v6) => Self::new_v6(v6, port),
    }
  }

  pub fn family(&self) -> Family {
    match self {
      Address::V4 { .. } => Family::V4,
      Address::V6 { .. } => Family::V6,
    }
  }

  pub fn port(&self) -> u16 {
    match *self {
      Address::V4 { port, .. } | Address::V6 { port, .. } => port,
    }
  }

  pub fn set_port(&mut self, new_port: u16) {
    match self {
      Address::V4 { port, .. } | Address::V6 { port, .. } => *port = new_port,
    }
  }

  #[must_use]
  pub fn with_port(mut self, port: u16) -> Self {
    self.set_port(port);
    self
  }

  pub fn ip(&self) -> IpAddr {
    match *self {
      Address::V4 { host, .. } => IpAddr::V4(Ipv4Addr::from(host)),
      Address::V6 { host, .. } => IpAddr::V6(Ipv6Addr::from(host)),
    }
  }

  /// Size in bytes of the OS socket address structure for this address.
  ///
  /// Depends on the family only: 16 for IPv4, 28 for IPv6.
  pub fn wire_size(&self) -> usize {
    self.family().wire_size()
  }

  /// Numeric text of the host part, without the port.
  pub fn to_text(&self) -> String {
    self.ip().to_string()
  }

  /// Writes the numeric host text into `buf` followed by a NUL byte and
  /// returns the text length (without the NUL).
  ///
  /// # Errors
  ///
  /// Returns [`Error::BufferTooSmall`] rather than truncating when the text
  /// and its terminator do not fit.
  pub fn write_host_ip(&self, buf: &mut [u8]) -> Result<usize> {
    let text = self.to_text();
    let needed = text.len() + 1;
    if needed > buf.len() {
      return Err(Error::BufferTooSmall { needed, available: buf.len() });
    }
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf[text.len()] = 0;
    Ok(text.len())
  }
}

impl fmt::Display for Address {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&SocketAddr::from(*self), f)
  }
}

impl FromStr for Address {
  type Err = Error;

  /// Parses `host:port` or `[v6host]:port` text.
  fn from_str(s: &str) -> Result<Self> {
    s.parse::<SocketAddr>()
      .map(Address::from)
      .map_err(|_| Error::resolution(libc::EAI_NONAME))
  }
}

impl From<SocketAddr> for Address {
  fn from(addr: SocketAddr) -> Self {
    match addr {
      SocketAddr::V4(v4) => Address::new_v4(*v4.ip(), v4.port()),
      SocketAddr::V6(v6) => Address::V6 {
        host: v6.ip().octets(),
        port: v6.port(),
        scope_id: v6.scope_id(),
      },
    }
  }
}

impl From<Address> for SocketAddr {
  fn from(addr: Address) -> Self {
    match addr {
      Address::V4 { host, port } => {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(host), port))
      }
      Address::V6 { host, port, scope_id } => SocketAddr::V6(
        SocketAddrV6::new(Ipv6Addr::from(host), port, 0, scope_id),
      ),
    }
  }
}
