use std::time::Duration;

/// Convert Duration to libc::timeval, truncated to whole milliseconds
///
/// Matches the precision of [`poll_timeout`] so both backends wait equally
/// long.
pub fn duration_to_timeval(duration: Duration) -> libc::timeval {
  let millis = duration.as_millis();
  libc::timeval {
    tv_sec: (millis / 1000) as libc::time_t,
    tv_usec: ((millis % 1000) * 1000) as libc::suseconds_t,
  }
}

/// Convert Duration to the millisecond timeout poll(2) takes
///
/// Clamped to `i32::MAX` rather than wrapping into poll's "forever" (-1).
pub fn poll_timeout(duration: Duration) -> libc::c_int {
  duration.as_millis().min(libc::c_int::MAX as u128) as libc::c_int
}
