//! Millisecond clock for protocol timing.
//!
//! Timestamps are wrapping `u32` milliseconds. Compare them with
//! [`time_less`] and friends rather than `<`, which breaks when the counter
//! wraps.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Two timestamps further apart than this are assumed to have wrapped.
pub const TIME_OVERFLOW: u32 = 86_400_000;

fn monotonic_millis() -> u32 {
  static EPOCH: OnceLock<Instant> = OnceLock::new();
  // Truncation is intended: the clock wraps every ~49.7 days.
  EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u32
}

/// A monotonic millisecond clock with a movable origin.
///
/// Each protocol host owns its own `TimeBase`, so hosts in one process
/// never disturb each other's notion of "now". Moving the origin takes
/// `&mut self`, so it cannot race with reads of the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
  base: u32,
}

impl TimeBase {
  /// Creates a clock whose current time is `0`.
  pub fn new() -> Self {
    Self { base: monotonic_millis() }
  }

  /// Milliseconds elapsed since the origin.
  pub fn get_time(&self) -> u32 {
    monotonic_millis().wrapping_sub(self.base)
  }

  /// Moves the origin so that [`get_time`](Self::get_time) reads
  /// `new_time` now.
  pub fn set_time(&mut self, new_time: u32) {
    self.base = monotonic_millis().wrapping_sub(new_time);
  }
}

impl Default for TimeBase {
  fn default() -> Self {
    Self::new()
  }
}

/// Whether `a` is earlier than `b`, across wrap-around.
pub fn time_less(a: u32, b: u32) -> bool {
  a.wrapping_sub(b) >= TIME_OVERFLOW
}

/// Whether `a` is later than `b`, across wrap-around.
pub fn time_greater(a: u32, b: u32) -> bool {
  b.wrapping_sub(a) >= TIME_OVERFLOW
}

/// Whether `a` is no later than `b`, across wrap-around.
pub fn time_less_equal(a: u32, b: u32) -> bool {
  !time_greater(a, b)
}

/// Whether `a` is no earlier than `b`, across wrap-around.
pub fn time_greater_equal(a: u32, b: u32) -> bool {
  !time_less(a, b)
}

/// Distance between two timestamps, accounting for wrap-around.
pub fn time_difference(a: u32, b: u32) -> u32 {
  if a.wrapping_sub(b) >= TIME_OVERFLOW {
    b.wrapping_sub(a)
  } else {
    a.wrapping_sub(b)
  }
}

/// Seed for a host's random number generator: wall-clock seconds.
pub fn random_seed() -> u32 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_secs() as u32)
    .unwrap_or(0)
}
