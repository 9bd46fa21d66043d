// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Explicit retry policy with exponential backoff and a typed outcome
// role: utilities/retry
// inputs: RetryPolicy (retries, min_timeout, factor); attempt closure; Sleeper
// outputs: RetryOutcome::{Success, Exhausted, Aborted}
// invariants: The closure runs at most retries + 1 times; backoff before retry n is min_timeout * factor^n
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use tracing::debug;

use crate::clock::Sleeper;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
  /// Retries after the first attempt.
  pub retries: u32,
  pub min_timeout: Duration,
  pub factor: f64,
}

impl RetryPolicy {
  pub const GITHUB_FETCH: RetryPolicy = RetryPolicy {
    retries: 3,
    min_timeout: Duration::from_secs(75),
    factor: 3.0,
  };

  pub const URL_PROBE: RetryPolicy = RetryPolicy {
    retries: 5,
    min_timeout: Duration::from_secs(75),
    factor: 5.0,
  };

  pub fn backoff(&self, retry_number: u32) -> Duration {
    self.min_timeout.mul_f64(self.factor.powi(retry_number as i32))
  }

  /// Run `attempt` until it is done, aborts, or the retry budget is spent.
  ///
  /// The closure receives the 1-based attempt number.
  pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut attempt: F) -> RetryOutcome<T>
  where
    F: FnMut(u32) -> Attempt<T>,
  {
    let mut last_reason = String::new();

    for n in 0..=self.retries {
      if n > 0 {
        let wait = self.backoff(n - 1);
        debug!(attempt = n + 1, wait_secs = wait.as_secs_f64(), reason = %last_reason, "retrying");
        sleeper.sleep(wait);
      }

      match attempt(n + 1) {
        Attempt::Done(v) => return RetryOutcome::Success(v),
        Attempt::Abort(reason) => return RetryOutcome::Aborted(reason),
        Attempt::Retry(reason) => last_reason = reason,
      }
    }

    RetryOutcome::Exhausted(last_reason)
  }
}

#[derive(Debug, PartialEq)]
pub enum Attempt<T> {
  Done(T),
  Retry(String),
  Abort(String),
}

#[derive(Debug, PartialEq)]
pub enum RetryOutcome<T> {
  Success(T),
  Exhausted(String),
  Aborted(String),
}

impl<T> RetryOutcome<T> {
  pub fn ok(self) -> Option<T> {
    match self {
      RetryOutcome::Success(v) => Some(v),
      _ => None,
    }
  }
}
