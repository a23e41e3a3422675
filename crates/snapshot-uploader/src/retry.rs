//! Bounded retries for fallible work.
//!

use core::{fmt::Display, num::NonZeroU32, time::Duration};
use std::thread::sleep;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Wait the base delay between every attempt.
    #[default]
    Fixed,

    /// Multiply the delay after every failed attempt.
    Exponential {
        /// The factor applied after each failed attempt.
        multiplier: u32,

        /// The upper bound for a single delay.
        #[serde(rename = "max_delay_ms", with = "millis")]
        max_delay: Duration,
    },
}

/// Invoke work until it succeeds or the attempts run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// The maximum number of times the work is invoked.
    pub max_attempts: NonZeroU32,

    /// The delay after the first failed attempt.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,

    /// How the delay grows.
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// The number of attempts used for uploads.
    pub const DEFAULT_ATTEMPTS: NonZeroU32 = NonZeroU32::new(3).unwrap();

    /// The base delay between attempts.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    /// Create a fixed delay policy.
    pub fn new(max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Override the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: NonZeroU32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// The delay to wait after the given failed attempt, starting at 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => multiplier
                .checked_pow(attempt.saturating_sub(1))
                .and_then(|factor| self.delay.checked_mul(factor))
                .map_or(max_delay, |delay| delay.min(max_delay)),
        }
    }

    /// Invoke `operation` until it returns `Ok` or the attempts are exhausted.
    ///
    /// The operation receives the current attempt number, starting at 1. The
    /// error of the final attempt is returned unchanged.
    pub fn call<T, E, F>(&self, context: impl Display, operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        self.call_with_sleep(context, blocking_sleep, operation)
    }

    /// As [`Self::call`], waiting between attempts with `sleep`.
    ///
    /// `sleep` runs once between each pair of attempts, never before the first
    /// attempt or after the last.
    pub fn call_with_sleep<T, E, F, S>(
        &self,
        context: impl Display,
        mut sleep: S,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.get();
        let mut attempt = 1;

        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => return Err(error),
                Err(error) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{context}Attempt {attempt}/{max_attempts} failed, retrying in {delay:?}: {error}"
                    );

                    sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Block the current thread for `delay`.
pub fn blocking_sleep(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay);
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use core::{cell::Cell, num::NonZeroU32, time::Duration};
    use std::time::Instant;

    use super::{Backoff, RetryPolicy};

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(NonZeroU32::new(attempts).unwrap(), Duration::ZERO)
    }

    #[test]
    fn succeeds_on_last_attempt() {
        let mut calls = Vec::new();
        let result: Result<u32, String> = policy(3).call("", |attempt| {
            calls.push(attempt);
            if attempt < 3 {
                Err(format!("failed {attempt}"))
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result, Ok(3));
        assert_eq!(calls, [1, 2, 3]);
    }

    #[test]
    fn returns_final_error_unchanged() {
        let mut calls = 0;
        let result: Result<(), String> = policy(2).call("", |attempt| {
            calls += 1;
            Err(format!("failed {attempt}"))
        });

        assert_eq!(result, Err("failed 2".to_string()));
        assert_eq!(calls, 2);
    }

    #[test]
    fn single_attempt_never_retries() {
        let mut calls = 0;
        let result: Result<(), &str> = policy(1).call("", |_| {
            calls += 1;
            Err("nope")
        });

        assert_eq!(result, Err("nope"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy::new(NonZeroU32::new(5).unwrap(), Duration::from_millis(100))
            .with_backoff(Backoff::Exponential {
                multiplier: 2,
                max_delay: Duration::from_millis(300),
            });

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for(40), Duration::from_millis(300));
    }

    #[test]
    fn default_is_three_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts.get(), 3);
        assert_eq!(policy.delay_for(2), RetryPolicy::DEFAULT_DELAY);
    }

    #[test]
    fn sleeps_only_between_attempts() {
        let policy = RetryPolicy::new(NonZeroU32::new(4).unwrap(), Duration::from_millis(10))
            .with_backoff(Backoff::Exponential {
                multiplier: 2,
                max_delay: Duration::from_secs(1),
            });

        let mut sleeps = Vec::new();
        let calls = Cell::new(0);
        let result: Result<(), &str> = policy.call_with_sleep(
            "",
            |delay| sleeps.push((calls.get(), delay)),
            |_| {
                calls.set(calls.get() + 1);
                Err("failed")
            },
        );

        assert_eq!(result, Err("failed"));
        assert_eq!(calls.get(), 4);
        assert_eq!(
            sleeps,
            [
                (1, Duration::from_millis(10)),
                (2, Duration::from_millis(20)),
                (3, Duration::from_millis(40)),
            ]
        );
    }

    #[test]
    fn first_success_never_sleeps() {
        let policy = RetryPolicy::new(NonZeroU32::new(3).unwrap(), Duration::from_secs(60));

        let mut sleeps = 0;
        let result: Result<u32, &str> = policy.call_with_sleep("", |_| sleeps += 1, Ok);

        assert_eq!(result, Ok(1));
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn blocks_for_the_delay_between_attempts() {
        let policy = RetryPolicy::new(NonZeroU32::new(3).unwrap(), Duration::from_millis(50));

        let start = Instant::now();
        let result: Result<(), &str> = policy.call("", |_| Err("failed"));
        let elapsed = start.elapsed();

        assert_eq!(result, Err("failed"));
        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    }
}
