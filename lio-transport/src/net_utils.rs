//! Marshaling between [`Address`] and the OS `sockaddr` structures.
//!
//! This is the only place where ports are swapped between host and network
//! byte order. Everything that hands an address to the kernel goes through
//! [`address_into_raw`], and everything that reads one back goes through
//! [`raw_into_address`].

use std::{io, mem, ptr};

use crate::address::Address;

/// Size of storage that fits any supported family.
pub(crate) const STORAGE_LEN: libc::socklen_t =
  mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

/// Zeroed storage for the kernel to write an address of unknown family into.
pub(crate) fn empty_storage() -> libc::sockaddr_storage {
  // SAFETY: sockaddr_storage is a C struct of integers and byte arrays, for
  // which all-zero is a valid value.
  unsafe { mem::zeroed() }
}

/// Encodes `addr` as a `sockaddr_in`/`sockaddr_in6` inside a fresh
/// `sockaddr_storage`, with the port converted to network order.
///
/// The returned length is [`Address::wire_size`].
pub(crate) fn address_into_raw(
  addr: &Address,
) -> (libc::sockaddr_storage, libc::socklen_t) {
  let mut storage = empty_storage();
  let storage_ptr = &mut storage as *mut libc::sockaddr_storage;

  match *addr {
    // SAFETY: sockaddr_storage is large enough and suitably aligned for
    // every concrete sockaddr type, and storage_ptr is a valid, exclusive
    // pointer to it.
    Address::V4 { host, port } => unsafe {
      ptr::write(storage_ptr.cast::<libc::sockaddr_in>(), into_addr(host, port));
    },
    // SAFETY: same as above, for sockaddr_in6.
    Address::V6 { host, port, scope_id } => unsafe {
      ptr::write(
        storage_ptr.cast::<libc::sockaddr_in6>(),
        into_addr6(host, port, scope_id),
      );
    },
  }

  (storage, addr.wire_size() as libc::socklen_t)
}

/// Decodes an address the kernel wrote, converting the port back to host
/// order.
///
/// # Safety
///
/// `raw` must point to at least `len` readable bytes holding a socket
/// address as written by the kernel or by `getaddrinfo`.
pub(crate) unsafe fn raw_into_address(
  raw: *const libc::sockaddr,
  len: libc::socklen_t,
) -> io::Result<Address> {
  let family_end = mem::offset_of!(libc::sockaddr, sa_family)
    + mem::size_of::<libc::sa_family_t>();
  if raw.is_null() || (len as usize) < family_end {
    return Err(io::Error::from_raw_os_error(libc::EINVAL));
  }

  // SAFETY: the caller guarantees `len` readable bytes, and we checked that
  // the family field is within them. read_unaligned because addrinfo
  // results make no alignment promise.
  let family =
    unsafe { ptr::read_unaligned(&raw const (*raw).sa_family) } as libc::c_int;

  match family {
    libc::AF_INET => {
      if (len as usize) < mem::size_of::<libc::sockaddr_in>() {
        return Err(io::Error::from_raw_os_error(libc::EINVAL));
      }
      // SAFETY: family is AF_INET and the length covers a sockaddr_in.
      let sin = unsafe { ptr::read_unaligned(raw.cast::<libc::sockaddr_in>()) };

      Ok(Address::V4 {
        // s_addr is already in network order in memory.
        host: sin.sin_addr.s_addr.to_ne_bytes(),
        port: u16::from_be(sin.sin_port),
      })
    }
    libc::AF_INET6 => {
      if (len as usize) < mem::size_of::<libc::sockaddr_in6>() {
        return Err(io::Error::from_raw_os_error(libc::EINVAL));
      }
      // SAFETY: family is AF_INET6 and the length covers a sockaddr_in6.
      let sin6 =
        unsafe { ptr::read_unaligned(raw.cast::<libc::sockaddr_in6>()) };

      Ok(Address::V6 {
        host: sin6.sin6_addr.s6_addr,
        port: u16::from_be(sin6.sin6_port),
        scope_id: sin6.sin6_scope_id,
      })
    }
    _ => Err(io::Error::from_raw_os_error(libc::EAFNOSUPPORT)),
  }
}

/// Decodes a `sockaddr_storage` filled in by `getsockname`, `accept` or
/// `recvmsg`.
pub(crate) fn storage_into_address(
  storage: &libc::sockaddr_storage,
  len: libc::socklen_t,
) -> io::Result<Address> {
  let len = len.min(STORAGE_LEN);
  // SAFETY: `storage` is a live sockaddr_storage and `len` is clamped to its
  // size.
  unsafe {
    raw_into_address(
      (storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
      len,
    )
  }
}

fn into_addr(host: [u8; 4], port: u16) -> libc::sockaddr_in {
  // SAFETY: sockaddr_in is a C struct with primitive integer fields.
  // Zero-initialization is safe - all fields accept zero as a valid value.
  let mut _addr: libc::sockaddr_in = unsafe { mem::zeroed() };

  #[cfg(any(apple, bsd))]
  {
    _addr.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
  }
  _addr.sin_family = libc::AF_INET as libc::sa_family_t;
  _addr.sin_port = port.to_be();
  _addr.sin_addr = libc::in_addr { s_addr: u32::from_ne_bytes(host) };

  _addr
}

fn into_addr6(host: [u8; 16], port: u16, scope_id: u32) -> libc::sockaddr_in6 {
  // SAFETY: sockaddr_in6 is a C struct with primitive integer/array fields.
  // Zero-initialization is safe - all fields accept zero as a valid value.
  let mut _addr: libc::sockaddr_in6 = unsafe { mem::zeroed() };

  #[cfg(any(apple, bsd))]
  {
    _addr.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
  }
  _addr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
  _addr.sin6_port = port.to_be();
  _addr.sin6_addr = libc::in6_addr { s6_addr: host };
  _addr.sin6_scope_id = scope_id;

  _addr
}
