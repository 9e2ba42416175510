//! Bounded retry with exponential back-off for Places calls.
//!
//! [`Backoff`] describes the schedule; [`retry_with_backoff`] drives an
//! operation through it. Only errors classified by [`is_retriable`] consume
//! further attempts. Every other error is surfaced immediately.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::PlacesError;

/// One scheduled attempt: the 1-based attempt number and the wait before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub number: u32,
    pub delay: Duration,
}

/// Retry schedule: `max_attempts` tries in total, where the wait after
/// failed attempt `a` is `initial_delay × 2^(a-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Backoff {
    /// `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before attempt `number`. Zero for the first attempt.
    #[must_use]
    pub fn delay_before(&self, number: u32) -> Duration {
        if number <= 1 {
            return Duration::ZERO;
        }
        let exponent = (number - 2).min(16);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }

    #[must_use]
    pub fn attempts(&self) -> Attempts {
        Attempts {
            backoff: *self,
            next: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attempts {
    backoff: Backoff,
    next: u32,
}

impl Iterator for Attempts {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        if self.next > self.backoff.max_attempts {
            return None;
        }
        let number = self.next;
        self.next += 1;
        Some(Attempt {
            number,
            delay: self.backoff.delay_before(number),
        })
    }
}

/// Returns `true` for errors worth another attempt.
///
/// Malformed requests will fail identically on every attempt, so they are
/// surfaced at once together with configuration and cancellation errors.
/// Quota, provider-status, HTTP and decoding failures are all retried.
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    !matches!(
        err,
        PlacesError::InvalidRequest(_)
            | PlacesError::InvalidBaseUrl { .. }
            | PlacesError::Cancelled
    )
}

/// Sleeps for `delay`, returning early with [`PlacesError::Cancelled`] if
/// `cancel` fires first.
pub(crate) async fn cancellable_sleep(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), PlacesError> {
    if cancel.is_cancelled() {
        return Err(PlacesError::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err(PlacesError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Runs `operation` under the `backoff` schedule.
///
/// The closure receives the attempt number. Non-retriable errors and the
/// error from the final attempt are returned as-is.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    backoff: &Backoff,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    if cancel.is_cancelled() {
        return Err(PlacesError::Cancelled);
    }
    let mut retries = backoff.attempts().skip(1);
    let mut number = 1;
    loop {
        let err = match operation(number).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) {
            return Err(err);
        }
        let Some(next) = retries.next() else {
            return Err(err);
        };
        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = next.delay.as_millis() as u64;
        tracing::warn!(
            attempt = number,
            max_attempts = backoff.max_attempts(),
            delay_ms,
            error = %err,
            "places call failed; retrying after back-off"
        );
        cancellable_sleep(next.delay, cancel).await?;
        number = next.number;
    }
}
