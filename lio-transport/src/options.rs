//! Socket options.
//!
//! Options are never cached: [`Socket::set_option`] writes straight to the
//! kernel and [`Socket::get_option`] reads straight from it. Every value is
//! an `i32`; booleans are `0`/`1` and timeouts are milliseconds.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};

use crate::address::Family;
use crate::error::{Error, Result};
use crate::socket::{Socket, SocketType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
  /// Non-blocking I/O (`O_NONBLOCK` / `FIONBIO`).
  NonBlock,
  /// `SO_BROADCAST`
  Broadcast,
  /// `SO_REUSEADDR`
  ReuseAddr,
  /// `SO_RCVBUF`, in bytes. Linux reports back twice the requested size.
  RecvBuffer,
  /// `SO_SNDBUF`, in bytes. Linux reports back twice the requested size.
  SendBuffer,
  /// `SO_RCVTIMEO`, in milliseconds. `0` disables the timeout.
  RecvTimeout,
  /// `SO_SNDTIMEO`, in milliseconds. `0` disables the timeout.
  SendTimeout,
  /// `TCP_NODELAY`; stream sockets only.
  NoDelay,
  /// `IPV6_V6ONLY`; IPv6 sockets only.
  Ipv6Only,
  /// `IP_TTL` or `IPV6_UNICAST_HOPS`, by family.
  Ttl,
  /// `SO_ERROR`: the pending socket error, cleared by reading. Read only.
  Error,
}

/// How an option is carried to the kernel.
enum Native {
  NonBlock,
  Int { level: libc::c_int, name: libc::c_int },
  Timeout { name: libc::c_int },
}

impl SocketOption {
  /// Maps the option onto this platform's native option for a socket of
  /// the given family and type, or `None` if it does not apply.
  fn native(self, family: Family, ty: SocketType) -> Option<Native> {
    let native = match (self, family, ty) {
      (Self::NonBlock, _, _) => Native::NonBlock,
      (Self::Broadcast, _, _) => {
        Native::Int { level: libc::SOL_SOCKET, name: libc::SO_BROADCAST }
      }
      (Self::ReuseAddr, _, _) => {
        Native::Int { level: libc::SOL_SOCKET, name: libc::SO_REUSEADDR }
      }
      (Self::RecvBuffer, _, _) => {
        Native::Int { level: libc::SOL_SOCKET, name: libc::SO_RCVBUF }
      }
      (Self::SendBuffer, _, _) => {
        Native::Int { level: libc::SOL_SOCKET, name: libc::SO_SNDBUF }
      }
      (Self::RecvTimeout, _, _) => Native::Timeout { name: libc::SO_RCVTIMEO },
      (Self::SendTimeout, _, _) => Native::Timeout { name: libc::SO_SNDTIMEO },
      (Self::NoDelay, _, SocketType::Stream) => {
        Native::Int { level: libc::IPPROTO_TCP, name: libc::TCP_NODELAY }
      }
      (Self::NoDelay, _, SocketType::Datagram) => return None,
      (Self::Ipv6Only, Family::V6, _) => {
        Native::Int { level: libc::IPPROTO_IPV6, name: libc::IPV6_V6ONLY }
      }
      (Self::Ipv6Only, Family::V4, _) => return None,
      (Self::Ttl, Family::V4, _) => {
        Native::Int { level: libc::IPPROTO_IP, name: libc::IP_TTL }
      }
      (Self::Ttl, Family::V6, _) => Native::Int {
        level: libc::IPPROTO_IPV6,
        name: libc::IPV6_UNICAST_HOPS,
      },
      (Self::Error, _, _) => {
        Native::Int { level: libc::SOL_SOCKET, name: libc::SO_ERROR }
      }
    };
    Some(native)
  }
}

impl Socket {
  /// Writes a socket option.
  ///
  /// # Errors
  ///
  /// [`Error::Configuration`] if the kernel rejects the value, or with
  /// `ENOPROTOOPT` if the option does not apply to this socket (for example
  /// [`SocketOption::NoDelay`] on a datagram socket) or is read only.
  pub fn set_option(&self, option: SocketOption, value: i32) -> Result<()> {
    let native = match option {
      SocketOption::Error => None,
      _ => option.native(self.family(), self.socket_type()),
    }
    .ok_or_else(|| Error::unsupported(option))?;

    let fd = self.as_raw_fd();
    let res = match native {
      Native::NonBlock => set_nonblocking(fd, value != 0),
      Native::Int { level, name } => setsockopt(fd, level, name, value),
      Native::Timeout { name } => millis_to_timeval(value)
        .and_then(|tv| setsockopt(fd, libc::SOL_SOCKET, name, tv)),
    };
    res.map_err(|source| Error::Configuration { option, source })
  }

  /// Reads a socket option.
  ///
  /// # Errors
  ///
  /// [`Error::Configuration`] if the kernel refuses, or with `ENOPROTOOPT`
  /// if the option does not apply to this socket.
  pub fn get_option(&self, option: SocketOption) -> Result<i32> {
    let native = option
      .native(self.family(), self.socket_type())
      .ok_or_else(|| Error::unsupported(option))?;

    let fd = self.as_raw_fd();
    let res = match native {
      Native::NonBlock => is_nonblocking(fd).map(i32::from),
      Native::Int { level, name } => getsockopt::<libc::c_int>(fd, level, name),
      Native::Timeout { name } => {
        getsockopt::<libc::timeval>(fd, libc::SOL_SOCKET, name)
          .map(timeval_to_millis)
      }
    };
    res.map_err(|source| Error::Configuration { option, source })
  }
}

fn setsockopt<T>(
  fd: RawFd,
  level: libc::c_int,
  name: libc::c_int,
  value: T,
) -> io::Result<()> {
  syscall!(setsockopt(
    fd,
    level,
    name,
    &value as *const T as *const libc::c_void,
    mem::size_of::<T>() as libc::socklen_t
  ))
  .map(drop)
}

fn getsockopt<T: Copy>(
  fd: RawFd,
  level: libc::c_int,
  name: libc::c_int,
) -> io::Result<T> {
  // SAFETY: only instantiated with C integer and timeval types, for which
  // all-zero is valid.
  let mut value: T = unsafe { mem::zeroed() };
  let mut len = mem::size_of::<T>() as libc::socklen_t;
  syscall!(getsockopt(
    fd,
    level,
    name,
    &mut value as *mut T as *mut libc::c_void,
    &mut len
  ))?;
  Ok(value)
}

#[cfg(has_fcntl)]
fn set_nonblocking(fd: RawFd, nonblocking: bool) -> io::Result<()> {
  let flags = syscall!(fcntl(fd, libc::F_GETFL))?;
  let flags = if nonblocking {
    flags | libc::O_NONBLOCK
  } else {
    flags & !libc::O_NONBLOCK
  };
  syscall!(fcntl(fd, libc::F_SETFL, flags)).map(drop)
}

#[cfg(not(has_fcntl))]
fn set_nonblocking(fd: RawFd, nonblocking: bool) -> io::Result<()> {
  let mut value = nonblocking as libc::c_int;
  syscall!(ioctl(fd, libc::FIONBIO, &mut value)).map(drop)
}

#[cfg(has_fcntl)]
fn is_nonblocking(fd: RawFd) -> io::Result<bool> {
  let flags = syscall!(fcntl(fd, libc::F_GETFL))?;
  Ok(flags & libc::O_NONBLOCK != 0)
}

// FIONBIO can only be written.
#[cfg(not(has_fcntl))]
fn is_nonblocking(_fd: RawFd) -> io::Result<bool> {
  Err(io::Error::from_raw_os_error(libc::ENOPROTOOPT))
}

/// Splits milliseconds into the seconds + microseconds pair the kernel
/// expects for `SO_RCVTIMEO`/`SO_SNDTIMEO`.
fn millis_to_timeval(millis: i32) -> io::Result<libc::timeval> {
  if millis < 0 {
    return Err(io::Error::from_raw_os_error(libc::EINVAL));
  }
  Ok(libc::timeval {
    tv_sec: (millis / 1000) as libc::time_t,
    tv_usec: ((millis % 1000) * 1000) as libc::suseconds_t,
  })
}

fn timeval_to_millis(tv: libc::timeval) -> i32 {
  let millis = tv.tv_sec as i64 * 1000 + tv.tv_usec as i64 / 1000;
  millis.clamp(0, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_millis_to_timeval_split() {
    let tv = millis_to_timeval(1500).unwrap();
    assert_eq!(tv.tv_sec, 1);
    assert_eq!(tv.tv_usec, 500_000);

    let tv = millis_to_timeval(999).unwrap();
    assert_eq!(tv.tv_sec, 0);
    assert_eq!(tv.tv_usec, 999_000);

    assert!(millis_to_timeval(-1).is_err());
  }

  #[test]
  fn test_timeval_to_millis() {
    let tv = libc::timeval { tv_sec: 2, tv_usec: 250_000 };
    assert_eq!(timeval_to_millis(tv), 2250);
  }

  #[test]
  fn test_option_applicability() {
    use SocketOption::*;

    let v4_dgram = |o: SocketOption| {
      o.native(Family::V4, SocketType::Datagram).is_some()
    };
    assert!(v4_dgram(Broadcast));
    assert!(v4_dgram(RecvTimeout));
    assert!(!v4_dgram(NoDelay));
    assert!(!v4_dgram(Ipv6Only));

    assert!(NoDelay.native(Family::V4, SocketType::Stream).is_some());
    assert!(Ipv6Only.native(Family::V6, SocketType::Datagram).is_some());
  }

  #[test]
  fn test_nonblock_round_trip() {
    let socket = Socket::new(SocketType::Datagram, Family::V4).unwrap();
    assert_eq!(socket.get_option(SocketOption::NonBlock).unwrap(), 0);

    socket.set_option(SocketOption::NonBlock, 1).unwrap();
    assert_eq!(socket.get_option(SocketOption::NonBlock).unwrap(), 1);

    socket.set_option(SocketOption::NonBlock, 0).unwrap();
    assert_eq!(socket.get_option(SocketOption::NonBlock).unwrap(), 0);
  }

  #[cfg(has_fcntl)]
  #[test]
  fn test_nonblock_read_matches_fionbio_write() {
    let socket = Socket::new(SocketType::Datagram, Family::V4).unwrap();
    let mut on: libc::c_int = 1;
    syscall!(ioctl(socket.as_raw_fd(), libc::FIONBIO, &mut on)).unwrap();
    assert_eq!(socket.get_option(SocketOption::NonBlock).unwrap(), 1);
  }

  #[cfg(not(has_fcntl))]
  #[test]
  fn test_nonblock_is_write_only_without_fcntl() {
    let socket = Socket::new(SocketType::Datagram, Family::V4).unwrap();
    socket.set_option(SocketOption::NonBlock, 1).unwrap();
    let err = socket.get_option(SocketOption::NonBlock).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOPROTOOPT));
  }

  #[test]
  fn test_error_option_is_read_only() {
    let socket = Socket::new(SocketType::Datagram, Family::V4).unwrap();
    assert_eq!(socket.get_option(SocketOption::Error).unwrap(), 0);

    let err = socket.set_option(SocketOption::Error, 1).unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ENOPROTOOPT));
  }
}
