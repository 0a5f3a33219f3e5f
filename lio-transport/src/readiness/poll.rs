use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use super::{ReadinessBackend, WaitCondition, util};

/// `poll(2)` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollBackend;

impl ReadinessBackend for PollBackend {
  fn poll_one(
    &self,
    fd: RawFd,
    want: WaitCondition,
    timeout: Duration,
  ) -> io::Result<WaitCondition> {
    let mut events: libc::c_short = 0;
    if want.contains(WaitCondition::SEND) {
      events |= libc::POLLOUT;
    }
    if want.contains(WaitCondition::RECEIVE) {
      events |= libc::POLLIN;
    }

    let mut pfd = libc::pollfd { fd, events, revents: 0 };
    let n = syscall!(poll(&mut pfd, 1, util::poll_timeout(timeout)))?;
    if n == 0 {
      return Ok(WaitCondition::empty());
    }

    revents_to_condition(pfd.revents, want)
  }
}

fn revents_to_condition(
  revents: libc::c_short,
  want: WaitCondition,
) -> io::Result<WaitCondition> {
  // select(2) fails with EBADF on a closed descriptor; poll reports it here.
  if revents & libc::POLLNVAL != 0 {
    return Err(io::Error::from_raw_os_error(libc::EBADF));
  }

  let mut ready = WaitCondition::empty();
  if revents & libc::POLLOUT != 0 {
    ready |= WaitCondition::SEND;
  }
  if revents & libc::POLLIN != 0 {
    ready |= WaitCondition::RECEIVE;
  }
  // An error makes every requested direction "ready": the next call on it
  // returns the error, which is what select(2) reports as well.
  if revents & libc::POLLERR != 0 {
    ready |= want;
  }
  if revents & libc::POLLHUP != 0 {
    ready |= want & WaitCondition::RECEIVE;
  }

  Ok(ready & want)
}
