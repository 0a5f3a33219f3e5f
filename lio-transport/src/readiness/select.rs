use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;
use std::{fmt, io, mem, ptr};

use super::{ReadinessBackend, WaitCondition, util};
use crate::error::{Error, Result};
use crate::socket::Socket;

fn fits(fd: RawFd) -> bool {
  fd >= 0 && (fd as usize) < libc::FD_SETSIZE as usize
}

/// A set of sockets for [`select`], backed by `fd_set`.
///
/// Sets are meant to be rebuilt before every call: `select` overwrites them
/// with the members that became ready.
pub struct SocketSet {
  raw: libc::fd_set,
}

impl SocketSet {
  pub fn new() -> Self {
    // SAFETY: fd_set is a plain bit array; FD_ZERO initialises it fully.
    let mut raw: libc::fd_set = unsafe { mem::zeroed() };
    unsafe { libc::FD_ZERO(&mut raw) };
    Self { raw }
  }

  pub fn clear(&mut self) {
    // SAFETY: raw is a valid fd_set.
    unsafe { libc::FD_ZERO(&mut self.raw) };
  }

  /// Adds `socket` to the set.
  ///
  /// # Errors
  ///
  /// [`Error::DescriptorOutOfRange`] if the descriptor is not below
  /// `FD_SETSIZE`.
  pub fn add(&mut self, socket: &Socket) -> Result<()> {
    let fd = socket.as_raw_fd();
    if !fits(fd) {
      return Err(Error::DescriptorOutOfRange(fd));
    }
    self.insert_raw(fd);
    Ok(())
  }

  pub fn remove(&mut self, socket: &Socket) {
    let fd = socket.as_raw_fd();
    if fits(fd) {
      // SAFETY: fd is within the bounds of the bit array.
      unsafe { libc::FD_CLR(fd, &mut self.raw) };
    }
  }

  pub fn contains(&self, socket: &Socket) -> bool {
    self.contains_raw(socket.as_raw_fd())
  }

  fn insert_raw(&mut self, fd: RawFd) {
    debug_assert!(fits(fd));
    // SAFETY: callers check that fd is within the bounds of the bit array.
    unsafe { libc::FD_SET(fd, &mut self.raw) };
  }

  fn contains_raw(&self, fd: RawFd) -> bool {
    // SAFETY: fd is within the bounds of the bit array.
    fits(fd) && unsafe { libc::FD_ISSET(fd, &self.raw) }
  }

  fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
    &mut self.raw
  }
}

impl Default for SocketSet {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for SocketSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let members =
      (0..libc::FD_SETSIZE as RawFd).filter(|&fd| self.contains_raw(fd));
    f.debug_set().entries(members).finish()
  }
}

/// Waits until a socket in `read` is readable or one in `write` is
/// writable, or `timeout` elapses.
///
/// `max_fd` is the highest descriptor in either set. On return each set
/// holds only its ready members. Returns the number of ready descriptors
/// across both sets, `0` on timeout.
///
/// # Errors
///
/// [`Error::DescriptorOutOfRange`] if `max_fd` is negative or not below
/// `FD_SETSIZE`, and [`Error::Io`] if `select(2)` fails, including when a
/// signal interrupts it (`EINTR`).
pub fn select(
  max_fd: RawFd,
  read: Option<&mut SocketSet>,
  write: Option<&mut SocketSet>,
  timeout: Duration,
) -> Result<usize> {
  // The kernel scans max_fd + 1 bits of each set; no more than the set holds.
  if !fits(max_fd) {
    return Err(Error::DescriptorOutOfRange(max_fd));
  }

  let mut tv = util::duration_to_timeval(timeout);
  let read = read.map_or(ptr::null_mut(), SocketSet::as_mut_ptr);
  let write = write.map_or(ptr::null_mut(), SocketSet::as_mut_ptr);

  let n = syscall!(select(max_fd + 1, read, write, ptr::null_mut(), &mut tv))?;
  Ok(n as usize)
}

/// `select(2)` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectBackend;

impl ReadinessBackend for SelectBackend {
  fn poll_one(
    &self,
    fd: RawFd,
    want: WaitCondition,
    timeout: Duration,
  ) -> io::Result<WaitCondition> {
    if !fits(fd) {
      return Err(io::Error::from_raw_os_error(libc::EINVAL));
    }

    let mut read = SocketSet::new();
    let mut write = SocketSet::new();
    if want.contains(WaitCondition::RECEIVE) {
      read.insert_raw(fd);
    }
    if want.contains(WaitCondition::SEND) {
      write.insert_raw(fd);
    }

    let mut tv = util::duration_to_timeval(timeout);
    let n = syscall!(select(
      fd + 1,
      read.as_mut_ptr(),
      write.as_mut_ptr(),
      ptr::null_mut(),
      &mut tv
    ))?;
    if n == 0 {
      return Ok(WaitCondition::empty());
    }

    let mut ready = WaitCondition::empty();
    if write.contains_raw(fd) {
      ready |= WaitCondition::SEND;
    }
    if read.contains_raw(fd) {
      ready |= WaitCondition::RECEIVE;
    }
    Ok(ready)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::udp_socket;
  use std::io::IoSlice;

  crate::generate_tests!(SelectBackend);

  #[test]
  fn test_socket_set_membership() {
    let a = udp_socket().unwrap();
    let b = udp_socket().unwrap();

    let mut set = SocketSet::new();
    set.add(&a).unwrap();
    assert!(set.contains(&a));
    assert!(!set.contains(&b));

    set.add(&b).unwrap();
    set.remove(&a);
    assert!(!set.contains(&a));
    assert!(set.contains(&b));

    set.clear();
    assert!(!set.contains(&b));
  }

  #[test]
  fn test_select_reports_only_ready_members() {
    let idle = udp_socket().unwrap();
    let busy = udp_socket().unwrap();
    let tx = udp_socket().unwrap();
    tx.send(Some(&busy.local_address().unwrap()), &[IoSlice::new(b"x")])
      .unwrap();

    let mut read = SocketSet::new();
    read.add(&idle).unwrap();
    read.add(&busy).unwrap();
    let max_fd = idle.as_raw_fd().max(busy.as_raw_fd());

    let n = select(max_fd, Some(&mut read), None, Duration::from_secs(1))
      .unwrap();
    assert_eq!(n, 1);
    assert!(read.contains(&busy));
    assert!(!read.contains(&idle));
  }

  #[test]
  fn test_select_times_out_and_clears_set() {
    let idle = udp_socket().unwrap();
    let mut read = SocketSet::new();
    read.add(&idle).unwrap();

    let n = select(
      idle.as_raw_fd(),
      Some(&mut read),
      None,
      Duration::from_millis(20),
    )
    .unwrap();
    assert_eq!(n, 0);
    assert!(!read.contains(&idle));
  }

  #[test]
  fn test_select_rejects_max_fd_beyond_set() {
    let mut write = SocketSet::new();
    let past_end = libc::FD_SETSIZE as RawFd;

    for max_fd in [past_end, past_end + 7, RawFd::MAX, -1] {
      match select(max_fd, None, Some(&mut write), Duration::ZERO) {
        Err(Error::DescriptorOutOfRange(fd)) => assert_eq!(fd, max_fd),
        other => panic!("expected DescriptorOutOfRange for {max_fd}, got {other:?}"),
      }
    }

    // The highest descriptor a set can hold is still accepted.
    assert_eq!(
      select(past_end - 1, None, Some(&mut write), Duration::ZERO).unwrap(),
      0
    );
  }
}
