//! Error types for lio-transport.

use std::ffi::CStr;
use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

use crate::address::Family;
use crate::options::SocketOption;

/// Main error type for lio-transport.
///
/// "Would block" is deliberately absent: transfers report it as `Ok(0)` and
/// waits as an empty [`WaitCondition`](crate::WaitCondition).
#[derive(Error, Debug)]
pub enum Error {
  /// Name lookup failed or returned nothing usable. `code` is the raw
  /// resolver status (`EAI_*`). For `EAI_SYSTEM`, `source` holds the
  /// `errno` the resolver left behind.
  #[error("name resolution failed: {message} (status {code})")]
  Resolution {
    code: i32,
    message: String,
    #[source]
    source: Option<io::Error>,
  },

  #[error("socket creation failed: {0}")]
  Creation(#[source] io::Error),

  /// A socket option could not be read or written, or does not apply to
  /// this socket's type or family.
  #[error("socket option {option:?} failed: {source}")]
  Configuration {
    option: SocketOption,
    #[source]
    source: io::Error,
  },

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),

  /// The datagram did not fit in the supplied buffers and was cut short by
  /// the kernel. No partial data is reported.
  #[error("datagram truncated: buffers hold only {capacity} bytes")]
  Truncated { capacity: usize },

  #[error("address family {address} does not match socket family {socket}")]
  FamilyMismatch { socket: Family, address: Family },

  #[error("buffer too small: need {needed} bytes, have {available}")]
  BufferTooSmall { needed: usize, available: usize },

  #[error("descriptor {0} does not fit in a socket set")]
  DescriptorOutOfRange(RawFd),
}

/// Result type alias for lio-transport.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
  /// Builds a [`Error::Resolution`] for a lookup this crate rejected itself.
  pub(crate) fn resolution(code: i32) -> Self {
    Self::resolution_with_source(code, None)
  }

  /// Builds a [`Error::Resolution`] from a status `getaddrinfo` or
  /// `getnameinfo` just returned. Must be called before anything else can
  /// overwrite `errno`.
  pub(crate) fn resolver_status(code: i32) -> Self {
    let source = (code == libc::EAI_SYSTEM).then(io::Error::last_os_error);
    Self::resolution_with_source(code, source)
  }

  fn resolution_with_source(code: i32, source: Option<io::Error>) -> Self {
    // SAFETY: gai_strerror returns a pointer to a static, NUL terminated
    // string (or null on some libcs for unknown codes).
    let message = unsafe {
      let ptr = libc::gai_strerror(code);
      if ptr.is_null() {
        String::from("unknown resolver error")
      } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
      }
    };
    Error::Resolution { code, message, source }
  }

  pub(crate) fn unsupported(option: SocketOption) -> Self {
    Error::Configuration {
      option,
      source: io::Error::from_raw_os_error(libc::ENOPROTOOPT),
    }
  }

  /// The OS `errno` behind this error, if there is one.
  ///
  /// Resolver statuses are not `errno` values and are not returned here; match
  /// on [`Error::Resolution`] for those. An `EAI_SYSTEM` resolution failure
  /// does report its `errno`.
  pub fn raw_os_error(&self) -> Option<i32> {
    match self {
      Error::Creation(err)
      | Error::Io(err)
      | Error::Configuration { source: err, .. }
      | Error::Resolution { source: Some(err), .. } => err.raw_os_error(),
      _ => None,
    }
  }

  /// Whether this error is `EADDRINUSE` from a bind.
  pub fn is_addr_in_use(&self) -> bool {
    self.raw_os_error() == Some(libc::EADDRINUSE)
  }
}

pub(crate) fn is_would_block(err: &io::Error) -> bool {
  err.kind() == io::ErrorKind::WouldBlock
}
