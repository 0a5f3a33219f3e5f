//! Socket handles.
//!
//! A [`Socket`] exclusively owns one OS descriptor. Its family and type are
//! fixed when it is created; nothing else is cached, so every option read
//! goes to the kernel. The descriptor is closed exactly once, when the
//! socket is dropped or [destroyed](Socket::destroy).
//!
//! ```text
//! new ─► bind / connect / listen ─► (accept children) ─► shutdown ─► destroy
//! ```

use std::net::Shutdown;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use tracing::{debug, trace};

use crate::address::{Address, Family};
use crate::error::{Error, Result, is_would_block};
use crate::net_utils;

/// Transport semantics of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
  /// Connectionless, message oriented (UDP).
  Datagram,
  /// Connection oriented byte stream (TCP).
  Stream,
}

impl SocketType {
  pub(crate) fn as_raw(self) -> libc::c_int {
    match self {
      SocketType::Datagram => libc::SOCK_DGRAM,
      SocketType::Stream => libc::SOCK_STREAM,
    }
  }
}

/// An owned OS socket.
#[derive(Debug)]
pub struct Socket {
  fd: OwnedFd,
  family: Family,
  ty: SocketType,
}

impl Socket {
  /// Opens a new socket of the given type and family.
  ///
  /// The descriptor is close-on-exec. On platforms with `SO_NOSIGPIPE` it is
  /// set as well, so writes to a closed stream fail with `EPIPE` instead of
  /// raising `SIGPIPE`.
  ///
  /// # Errors
  ///
  /// [`Error::Creation`] if the OS refuses (descriptor limits, unsupported
  /// family).
  pub fn new(ty: SocketType, family: Family) -> Result<Self> {
    let fd = open_raw(ty, family).map_err(Error::Creation)?;
    trace!(fd = fd.as_raw_fd(), ?ty, %family, "socket created");
    Ok(Socket { fd, family, ty })
  }

  pub fn family(&self) -> Family {
    self.family
  }

  pub fn socket_type(&self) -> SocketType {
    self.ty
  }

  /// Binds the socket to a local address.
  ///
  /// The port is converted to network order on a private copy; `address`
  /// is not modified.
  ///
  /// # Errors
  ///
  /// [`Error::FamilyMismatch`] if `address` is of the other family, and
  /// [`Error::Io`] for OS failures such as `EADDRINUSE`.
  pub fn bind(&self, address: &Address) -> Result<()> {
    self.check_family(address)?;
    let (storage, len) = net_utils::address_into_raw(address);
    syscall!(bind(
      self.fd.as_raw_fd(),
      (&storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
      len
    ))?;
    debug!(fd = self.fd.as_raw_fd(), %address, "socket bound");
    Ok(())
  }

  /// Marks a stream socket as passive. A negative `backlog` means the
  /// system maximum (`SOMAXCONN`).
  pub fn listen(&self, backlog: i32) -> Result<()> {
    let backlog = if backlog < 0 { libc::SOMAXCONN } else { backlog };
    syscall!(listen(self.fd.as_raw_fd(), backlog))?;
    debug!(fd = self.fd.as_raw_fd(), backlog, "socket listening");
    Ok(())
  }

  /// Connects a stream socket, or fixes the default peer of a datagram
  /// socket.
  ///
  /// On a non-blocking socket `EINPROGRESS` counts as success; wait for
  /// [`WaitCondition::SEND`](crate::WaitCondition::SEND) and read
  /// [`SocketOption::Error`](crate::SocketOption::Error) to learn the outcome.
  pub fn connect(&self, address: &Address) -> Result<()> {
    self.check_family(address)?;
    let (storage, len) = net_utils::address_into_raw(address);
    let res = syscall!(connect(
      self.fd.as_raw_fd(),
      (&storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
      len
    ));

    match res {
      Ok(_) => {}
      Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => {
        trace!(fd = self.fd.as_raw_fd(), %address, "connect in progress");
      }
      Err(err) => return Err(Error::Io(err)),
    }
    debug!(fd = self.fd.as_raw_fd(), %address, "socket connected");
    Ok(())
  }

  /// Accepts a pending connection.
  ///
  /// Returns the new socket and the peer's address, or `Ok(None)` if this
  /// is a non-blocking socket with nothing pending.
  pub fn accept(&self) -> Result<Option<(Socket, Address)>> {
    // The peer family is unknown until the call returns, so size for the
    // largest one.
    let mut storage = net_utils::empty_storage();
    let mut len = net_utils::STORAGE_LEN;
    let storage_ptr =
      (&mut storage as *mut libc::sockaddr_storage).cast::<libc::sockaddr>();

    #[cfg(has_sock_cloexec)]
    let res = syscall!(accept4(
      self.fd.as_raw_fd(),
      storage_ptr,
      &mut len,
      libc::SOCK_CLOEXEC
    ));

    #[cfg(not(has_sock_cloexec))]
    let res = syscall!(accept(self.fd.as_raw_fd(), storage_ptr, &mut len));

    let raw = match res {
      Ok(raw) => raw,
      Err(err) if is_would_block(&err) => return Ok(None),
      Err(err) => return Err(Error::Io(err)),
    };

    // SAFETY: accept just handed us this descriptor; nothing else owns it.
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    #[cfg(not(has_sock_cloexec))]
    set_cloexec(fd.as_raw_fd())?;
    disable_sigpipe(fd.as_raw_fd())?;

    let address = net_utils::storage_into_address(&storage, len)?;
    trace!(listener = self.fd.as_raw_fd(), fd = raw, %address, "accepted");
    Ok(Some((Socket { fd, family: self.family, ty: self.ty }, address)))
  }

  /// Disables further receives, sends, or both.
  pub fn shutdown(&self, how: Shutdown) -> Result<()> {
    let how = match how {
      Shutdown::Read => libc::SHUT_RD,
      Shutdown::Write => libc::SHUT_WR,
      Shutdown::Both => libc::SHUT_RDWR,
    };
    syscall!(shutdown(self.fd.as_raw_fd(), how))?;
    Ok(())
  }

  /// The address the socket is bound to, port in host order.
  pub fn local_address(&self) -> Result<Address> {
    let mut storage = net_utils::empty_storage();
    let mut len = net_utils::STORAGE_LEN;
    syscall!(getsockname(
      self.fd.as_raw_fd(),
      (&mut storage as *mut libc::sockaddr_storage).cast::<libc::sockaddr>(),
      &mut len
    ))?;
    Ok(net_utils::storage_into_address(&storage, len)?)
  }

  /// Closes the socket. Equivalent to dropping it.
  pub fn destroy(self) {
    trace!(fd = self.fd.as_raw_fd(), "socket destroyed");
    drop(self);
  }

  pub(crate) fn check_family(&self, address: &Address) -> Result<()> {
    if address.family() == self.family {
      Ok(())
    } else {
      Err(Error::FamilyMismatch {
        socket: self.family,
        address: address.family(),
      })
    }
  }
}

impl AsFd for Socket {
  fn as_fd(&self) -> BorrowedFd<'_> {
    self.fd.as_fd()
  }
}

impl AsRawFd for Socket {
  fn as_raw_fd(&self) -> RawFd {
    self.fd.as_raw_fd()
  }
}

impl IntoRawFd for Socket {
  fn into_raw_fd(self) -> RawFd {
    self.fd.into_raw_fd()
  }
}

fn open_raw(ty: SocketType, family: Family) -> std::io::Result<OwnedFd> {
  // Platforms with SOCK_CLOEXEC set the flag atomically with creation.
  #[cfg(has_sock_cloexec)]
  let raw = syscall!(socket(
    family.as_raw(),
    ty.as_raw() | libc::SOCK_CLOEXEC,
    0
  ))?;

  #[cfg(not(has_sock_cloexec))]
  let raw = syscall!(socket(family.as_raw(), ty.as_raw(), 0))?;

  // SAFETY: We literally just created it. From here on the descriptor is
  // closed by OwnedFd on every early return.
  let fd = unsafe { OwnedFd::from_raw_fd(raw) };

  #[cfg(not(has_sock_cloexec))]
  set_cloexec(fd.as_raw_fd())?;

  disable_sigpipe(fd.as_raw_fd())?;
  Ok(fd)
}

#[cfg(not(has_sock_cloexec))]
fn set_cloexec(fd: RawFd) -> std::io::Result<()> {
  syscall!(ioctl(fd, libc::FIOCLEX)).map(drop)
}

/// Makes writes to a closed peer fail with `EPIPE` instead of raising
/// `SIGPIPE`. Linux gets the same effect from `MSG_NOSIGNAL` per send.
fn disable_sigpipe(#[allow(unused)] fd: RawFd) -> std::io::Result<()> {
  #[cfg(has_so_nosigpipe)]
  {
    let opt: libc::c_int = 1;
    syscall!(setsockopt(
      fd,
      libc::SOL_SOCKET,
      libc::SO_NOSIGPIPE,
      &opt as *const libc::c_int as *const libc::c_void,
      std::mem::size_of::<libc::c_int>() as libc::socklen_t
    ))?;
  }

  Ok(())
}
