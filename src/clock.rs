// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Injectable wall clock and sleeper so TTL expiry, lookback windows and rate-limit waits are testable
// role: utilities/time
// outputs: Clock and Sleeper traits with system and manual implementations
// invariants: ManualClock only moves when told to; ThreadSleeper never sleeps for negative durations
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn now_millis(&self) -> i64 {
    self.now().timestamp_millis()
  }
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock pinned to an instant until advanced; cheap to clone, clones share the instant.
#[derive(Clone)]
pub struct ManualClock {
  instant: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      instant: Arc::new(Mutex::new(start)),
    }
  }

  #[cfg(test)]
  pub fn set(&self, to: DateTime<Utc>) {
    if let Ok(mut cur) = self.instant.lock() {
      *cur = to;
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut cur) = self.instant.lock() {
      *cur += by;
    }
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    match self.instant.lock() {
      Ok(cur) => *cur,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }
}

pub trait Sleeper {
  fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
  fn sleep(&self, duration: Duration) {
    if !duration.is_zero() {
      std::thread::sleep(duration);
    }
  }
}

/// Sleeper that moves a manual clock forward instead of blocking the thread.
pub struct ClockSleeper {
  clock: ManualClock,
}

impl ClockSleeper {
  pub fn new(clock: ManualClock) -> Self {
    Self { clock }
  }
}

impl Sleeper for ClockSleeper {
  fn sleep(&self, duration: Duration) {
    if let Ok(d) = chrono::Duration::from_std(duration) {
      self.clock.advance(d);
    }
  }
}

/// Records requested sleeps without blocking.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSleeper {
  pub slept: std::cell::RefCell<Vec<Duration>>,
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
  fn sleep(&self, duration: Duration) {
    self.slept.borrow_mut().push(duration);
  }
}

/// Duration from `now` until `instant`, zero when the instant is already behind us.
pub fn until(now: DateTime<Utc>, instant: DateTime<Utc>) -> Duration {
  (instant - now).to_std().unwrap_or(Duration::ZERO)
}
