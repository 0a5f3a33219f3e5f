//! Readiness waiting.
//!
//! [`Socket::wait`] blocks until one socket can send or receive, a timeout
//! elapses, or a signal interrupts the wait. [`select`] is the multi-socket
//! form over [`SocketSet`]s.
//!
//! The OS facility behind [`Socket::wait`] is a [`ReadinessBackend`]:
//!
//! - [`PollBackend`]: `poll(2)`. Used where poll is trustworthy.
//! - [`SelectBackend`]: `select(2)`. Used on Apple platforms.
//!
//! Backends report the raw OS outcome. How an interrupted wait is reported
//! is decided once, in [`Socket::wait_with`], so both backends behave the
//! same.

mod poll;
mod select;
mod util;


use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use bitflags::bitflags;
use tracing::debug;

use crate::error::{Error, Result};
use crate::socket::Socket;

pub use poll::PollBackend;
pub use select::{SelectBackend, SocketSet, select};

bitflags! {
  /// Conditions a wait asks for and reports. The empty set means "nothing
  /// happened before the timeout".
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct WaitCondition: u32 {
    /// The socket can accept more outgoing data.
    const SEND = 1 << 0;
    /// Data (or a connection, or end of stream) is available.
    const RECEIVE = 1 << 1;
    /// Asked for: report a signal as a result rather than an error.
    /// Reported: the wait was cut short by a signal.
    const INTERRUPT = 1 << 2;
  }
}

/// An OS facility that can wait for readiness on a single descriptor.
pub trait ReadinessBackend {
  /// Waits up to `timeout` for any of the `SEND`/`RECEIVE` conditions in
  /// `want` on `fd`.
  ///
  /// Returns the subset of `want` that is ready, empty on timeout. An
  /// interrupted wait is returned as an `EINTR` error; the backend never
  /// reports [`WaitCondition::INTERRUPT`] itself.
  fn poll_one(
    &self,
    fd: RawFd,
    want: WaitCondition,
    timeout: Duration,
  ) -> io::Result<WaitCondition>;
}

#[cfg(has_poll)]
pub type DefaultBackend = PollBackend;

#[cfg(not(has_poll))]
pub type DefaultBackend = SelectBackend;

impl Socket {
  /// Waits until this socket satisfies a condition in `want`.
  ///
  /// Returns what was observed: a subset of `want`'s `SEND`/`RECEIVE`, the
  /// empty set on timeout, or exactly [`WaitCondition::INTERRUPT`] if a
  /// signal arrived and `want` contains `INTERRUPT`. A zero `timeout` polls
  /// without blocking. Sub-millisecond precision is discarded.
  ///
  /// # Errors
  ///
  /// [`Error::Io`] if the wait fails, including `EINTR` when `want` does not
  /// contain `INTERRUPT`.
  pub fn wait(
    &self,
    want: WaitCondition,
    timeout: Duration,
  ) -> Result<WaitCondition> {
    self.wait_with(&DefaultBackend::default(), want, timeout)
  }

  /// [`wait`](Self::wait) with an explicit backend.
  pub fn wait_with<B: ReadinessBackend>(
    &self,
    backend: &B,
    want: WaitCondition,
    timeout: Duration,
  ) -> Result<WaitCondition> {
    let io_want = want & (WaitCondition::SEND | WaitCondition::RECEIVE);

    match backend.poll_one(self.as_raw_fd(), io_want, timeout) {
      Ok(ready) => Ok(ready & io_want),
      Err(err)
        if err.kind() == io::ErrorKind::Interrupted
          && want.contains(WaitCondition::INTERRUPT) =>
      {
        debug!(fd = self.as_raw_fd(), "wait interrupted by signal");
        Ok(WaitCondition::INTERRUPT)
      }
      Err(err) => Err(Error::Io(err)),
    }
  }
}
