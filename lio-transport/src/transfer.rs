//! Scatter/gather datagram transfer.
//!
//! One call moves at most one datagram (or one chunk of a stream) through a
//! single `sendmsg`/`recvmsg`. Buffers are gathered and scattered in order.
//!
//! A transfer that would block reports `Ok(0)`. A zero-length datagram also
//! reports `Ok(0)`; callers that need to tell the two apart should
//! [`wait`](Socket::wait) for readiness first.

use std::io::{IoSlice, IoSliceMut};
use std::os::fd::AsRawFd;
use std::{mem, ptr};

use tracing::trace;

use crate::address::Address;
use crate::error::{Error, Result, is_would_block};
use crate::net_utils;
use crate::socket::Socket;

#[cfg(has_msg_nosignal)]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;

#[cfg(not(has_msg_nosignal))]
const SEND_FLAGS: libc::c_int = 0;

fn empty_msghdr() -> libc::msghdr {
  // SAFETY: msghdr is a C struct of integers and pointers; all-zero (null
  // name, no iovecs, no control data) is a valid value.
  unsafe { mem::zeroed() }
}

impl Socket {
  /// Sends the concatenation of `bufs` as one datagram.
  ///
  /// `peer` is the destination for unconnected datagram sockets; pass `None`
  /// on connected sockets. Returns the number of bytes sent, or `Ok(0)` if a
  /// non-blocking socket has no room.
  ///
  /// # Errors
  ///
  /// [`Error::FamilyMismatch`] if `peer` is of the other family, and
  /// [`Error::Io`] for any OS failure other than would-block.
  pub fn send(
    &self,
    peer: Option<&Address>,
    bufs: &[IoSlice<'_>],
  ) -> Result<usize> {
    let mut msg = empty_msghdr();

    // Must outlive the sendmsg call below.
    let name = match peer {
      Some(address) => {
        self.check_family(address)?;
        Some(net_utils::address_into_raw(address))
      }
      None => None,
    };
    if let Some((storage, len)) = &name {
      msg.msg_name = (storage as *const libc::sockaddr_storage)
        .cast_mut()
        .cast::<libc::c_void>();
      msg.msg_namelen = *len;
    }

    // IoSlice is guaranteed ABI compatible with iovec on Unix.
    msg.msg_iov = bufs.as_ptr().cast_mut().cast::<libc::iovec>();
    msg.msg_iovlen = bufs.len() as _;

    match syscall!(sendmsg(self.as_raw_fd(), &msg, SEND_FLAGS)) {
      Ok(sent) => Ok(sent as usize),
      Err(err) if is_would_block(&err) => {
        trace!(fd = self.as_raw_fd(), "send would block");
        Ok(0)
      }
      Err(err) => Err(Error::Io(err)),
    }
  }

  /// Receives one datagram, scattering it over `bufs` in order.
  ///
  /// On success `peer`, if given, is overwritten with the sender's address.
  /// Returns the number of bytes received, or `Ok(0)` if a non-blocking
  /// socket has nothing pending; `peer` is left untouched in that case.
  ///
  /// # Errors
  ///
  /// [`Error::Truncated`] if the datagram was larger than the buffers. The
  /// excess is discarded by the kernel and no partial length is reported.
  /// [`Error::Io`] for any OS failure other than would-block.
  pub fn receive(
    &self,
    peer: Option<&mut Address>,
    bufs: &mut [IoSliceMut<'_>],
  ) -> Result<usize> {
    let mut msg = empty_msghdr();
    let mut storage = net_utils::empty_storage();

    if peer.is_some() {
      msg.msg_name = ptr::from_mut(&mut storage).cast::<libc::c_void>();
      msg.msg_namelen = net_utils::STORAGE_LEN;
    }
    msg.msg_iov = bufs.as_mut_ptr().cast::<libc::iovec>();
    msg.msg_iovlen = bufs.len() as _;

    let received = match syscall!(recvmsg(self.as_raw_fd(), &mut msg, 0)) {
      Ok(received) => received as usize,
      Err(err) if is_would_block(&err) => {
        trace!(fd = self.as_raw_fd(), "receive would block");
        return Ok(0);
      }
      Err(err) => return Err(Error::Io(err)),
    };

    if msg.msg_flags & libc::MSG_TRUNC != 0 {
      let capacity = bufs.iter().map(|buf| buf.len()).sum();
      trace!(fd = self.as_raw_fd(), capacity, "datagram truncated");
      return Err(Error::Truncated { capacity });
    }

    // Connected stream sockets report no sender.
    if let Some(peer) = peer
      && msg.msg_namelen > 0
    {
      *peer = net_utils::storage_into_address(&storage, msg.msg_namelen)?;
    }

    Ok(received)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::address::Family;
  use crate::options::SocketOption;
  use crate::socket::SocketType;
  use crate::test_utils::udp_socket;

  #[test]
  fn test_gather_send_scatter_receive() {
    let rx = udp_socket().unwrap();
    let tx = udp_socket().unwrap();
    let to = rx.local_address().unwrap();

    let sent = tx
      .send(Some(&to), &[IoSlice::new(b"hello "), IoSlice::new(b"world")])
      .unwrap();
    assert_eq!(sent, 11);

    let mut head = [0u8; 4];
    let mut tail = [0u8; 16];
    let mut from = Address::ANY_V4;
    let received = rx
      .receive(
        Some(&mut from),
        &mut [IoSliceMut::new(&mut head), IoSliceMut::new(&mut tail)],
      )
      .unwrap();

    assert_eq!(received, 11);
    assert_eq!(&head, b"hell");
    assert_eq!(&tail[..7], b"o world");
    assert_eq!(from, tx.local_address().unwrap());
  }

  #[test]
  fn test_receive_would_block_leaves_peer_untouched() {
    let rx = udp_socket().unwrap();
    rx.set_option(SocketOption::NonBlock, 1).unwrap();

    let sentinel = Address::parse("10.1.2.3", 4242).unwrap();
    let mut peer = sentinel;
    let mut buf = [0u8; 32];
    let n = rx
      .receive(Some(&mut peer), &mut [IoSliceMut::new(&mut buf)])
      .unwrap();

    assert_eq!(n, 0);
    assert_eq!(peer, sentinel);
  }

  #[test]
  fn test_truncated_datagram_is_an_error() {
    let rx = udp_socket().unwrap();
    let tx = udp_socket().unwrap();
    let to = rx.local_address().unwrap();
    tx.send(Some(&to), &[IoSlice::new(&[7u8; 64])]).unwrap();

    let mut small = [0u8; 10];
    match rx.receive(None, &mut [IoSliceMut::new(&mut small)]) {
      Err(Error::Truncated { capacity }) => assert_eq!(capacity, 10),
      other => panic!("expected Truncated, got {other:?}"),
    }
  }

  #[test]
  fn test_send_to_other_family_is_rejected() {
    let tx = Socket::new(SocketType::Datagram, Family::V4).unwrap();
    let to = Address::parse("::1", 9).unwrap();
    let err = tx.send(Some(&to), &[IoSlice::new(b"x")]).unwrap_err();
    assert!(matches!(err, Error::FamilyMismatch { .. }));
  }
}
