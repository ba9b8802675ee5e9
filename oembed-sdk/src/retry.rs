// ABOUTME: Retry loop with configurable delay, backoff and optional bounds
// ABOUTME: Sleeping goes through a trait so callers and tests control time

use crate::constants::{retry, thumbnail};
use crate::error::EmbedError;
use std::time::{Duration, Instant};

/// Something that can block the current thread for a while.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// When and how often to retry a retryable failure.
///
/// With neither `max_attempts` nor `deadline` set the loop never gives up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: thumbnail::RETRY_DELAY,
            backoff_multiplier: retry::BACKOFF_MULTIPLIER,
            max_delay: retry::MAX_DELAY,
            max_attempts: None,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.deadline.is_some()
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let scaled = Duration::from_millis((delay.as_millis() as f64 * self.backoff_multiplier) as u64);
        std::cmp::min(scaled, self.max_delay)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's bounds are hit. The closure receives the 1-based attempt.
pub fn retry_with_policy<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, EmbedError>
where
    F: FnMut(u32) -> Result<T, EmbedError>,
{
    let started = Instant::now();
    let mut delay = policy.delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let error = match operation(attempt) {
            Ok(result) => return Ok(result),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) => error,
        };

        let out_of_attempts = policy.max_attempts.is_some_and(|max| attempt >= max);
        let past_deadline = policy
            .deadline
            .is_some_and(|deadline| started.elapsed() + delay > deadline);
        if out_of_attempts || past_deadline {
            log::warn!("Giving up after {} attempts: {}", attempt, error);
            return Err(EmbedError::RetriesExhausted { attempts: attempt });
        }

        log::warn!(
            "Attempt {} failed ({}); waiting {:?}",
            attempt,
            error,
            delay
        );
        sleeper.sleep(delay);
        delay = policy.next_delay(delay);
    }
}
