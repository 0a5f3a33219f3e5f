//! Forward and reverse name resolution.
//!
//! Which resolver backs [`Address::resolve`] and [`Address::reverse_lookup`]
//! is decided at compile time: [`GaiResolver`] where the platform has
//! `getaddrinfo`/`getnameinfo`, [`LiteralResolver`] otherwise. Both are
//! usable directly.

use std::ffi::{CStr, CString};
use std::ptr;

use tracing::{debug, trace};

use crate::address::Address;
use crate::error::{Error, Result};

/// A name resolution strategy.
pub trait Resolver {
  /// Resolves `name` (a hostname or an address literal) to one address.
  ///
  /// The first usable result wins. `port` of `None` yields port `0`.
  fn lookup_host(&self, name: &str, port: Option<u16>) -> Result<Address>;

  /// Finds a host name for `address`.
  ///
  /// When no name is registered for the address this returns its numeric
  /// text instead of failing.
  fn lookup_name(&self, address: &Address) -> Result<String>;
}

#[cfg(has_getaddrinfo)]
pub type DefaultResolver = GaiResolver;

#[cfg(not(has_getaddrinfo))]
pub type DefaultResolver = LiteralResolver;

/// Resolver that only understands numeric address text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralResolver;

impl Resolver for LiteralResolver {
  fn lookup_host(&self, name: &str, port: Option<u16>) -> Result<Address> {
    Address::parse(name, port.unwrap_or(0))
  }

  fn lookup_name(&self, address: &Address) -> Result<String> {
    Ok(address.to_text())
  }
}

/// Resolver backed by `getaddrinfo(3)` and `getnameinfo(3)`.
#[cfg(has_getaddrinfo)]
#[derive(Debug, Default, Clone, Copy)]
pub struct GaiResolver;

/// Room for any host name `getnameinfo` will produce (`NI_MAXHOST`).
#[cfg(has_getaddrinfo)]
const NAME_CAPACITY: usize = 1025;

/// Owns a `getaddrinfo` result list and frees it on drop.
#[cfg(has_getaddrinfo)]
struct AddrInfoList(*mut libc::addrinfo);

#[cfg(has_getaddrinfo)]
impl AddrInfoList {
  fn iter(&self) -> impl Iterator<Item = &libc::addrinfo> {
    let mut next = self.0;
    std::iter::from_fn(move || {
      // SAFETY: every node in the list stays valid until freeaddrinfo runs
      // in Drop, which cannot happen while `self` is borrowed.
      let node = unsafe { next.as_ref()? };
      next = node.ai_next;
      Some(node)
    })
  }
}

#[cfg(has_getaddrinfo)]
impl Drop for AddrInfoList {
  fn drop(&mut self) {
    if !self.0.is_null() {
      // SAFETY: the pointer came from a successful getaddrinfo and is freed
      // exactly once.
      unsafe { libc::freeaddrinfo(self.0) };
    }
  }
}

#[cfg(has_getaddrinfo)]
impl Resolver for GaiResolver {
  fn lookup_host(&self, name: &str, port: Option<u16>) -> Result<Address> {
    let c_name =
      CString::new(name).map_err(|_| Error::resolution(libc::EAI_NONAME))?;

    // SAFETY: addrinfo is a C struct of integers and pointers; all-zero
    // (null pointers) is a valid hints value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_DGRAM;

    let mut head: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: c_name is NUL terminated, hints is initialised and head is a
    // valid out pointer.
    let status = unsafe {
      libc::getaddrinfo(c_name.as_ptr(), ptr::null(), &hints, &mut head)
    };
    let list = AddrInfoList(head);

    if status != 0 {
      let err = Error::resolver_status(status);
      debug!(name, status, "getaddrinfo failed");
      return Err(err);
    }

    let found = list.iter().find_map(|info| {
      // SAFETY: ai_addr points to ai_addrlen bytes owned by the list.
      unsafe { crate::net_utils::raw_into_address(info.ai_addr, info.ai_addrlen) }
        .ok()
    });

    match found {
      Some(address) => {
        let address = address.with_port(port.unwrap_or(0));
        trace!(name, %address, "resolved host");
        Ok(address)
      }
      None => Err(Error::resolution(libc::EAI_NONAME)),
    }
  }

  fn lookup_name(&self, address: &Address) -> Result<String> {
    let (storage, len) = crate::net_utils::address_into_raw(address);
    let mut name = [0u8; NAME_CAPACITY];

    // SAFETY: storage holds `len` bytes of a valid sockaddr and `name` is a
    // writable buffer of the length we pass.
    let status = unsafe {
      libc::getnameinfo(
        (&storage as *const libc::sockaddr_storage).cast::<libc::sockaddr>(),
        len,
        name.as_mut_ptr().cast::<libc::c_char>(),
        name.len() as _,
        ptr::null_mut(),
        0,
        libc::NI_NAMEREQD,
      )
    };

    match status {
      0 => match CStr::from_bytes_until_nul(&name) {
        Ok(text) => Ok(text.to_string_lossy().into_owned()),
        Err(_) => Err(Error::BufferTooSmall {
          needed: NAME_CAPACITY + 1,
          available: NAME_CAPACITY,
        }),
      },
      libc::EAI_NONAME => {
        debug!(%address, "no name registered, using numeric text");
        Ok(address.to_text())
      }
      status => Err(Error::resolver_status(status)),
    }
  }
}
