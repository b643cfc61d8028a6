use embedded_hal_async::delay::DelayNs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u8,
    /// Delay used when an attempt returns [`Outcome::Retry`]
    pub delay_ms: u32,
}

impl RetryPolicy {
    pub const fn new(attempts: u8, delay_ms: u32) -> Self {
        Self { attempts, delay_ms }
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// Success, stop retrying
    Done(T),
    /// Try again after the policy delay
    Retry,
    /// Try again after the given delay (0 retries immediately)
    RetryAfter(u32),
    /// Unrecoverable, stop without further attempts
    Abort(E),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    Exhausted,
    Aborted(E),
}

/// Run `op` until it succeeds, aborts or `policy.attempts` is reached.
///
/// `op` receives the zero-based attempt number. No delay follows the final
/// attempt.
pub async fn retry<T, E, D>(
    policy: RetryPolicy,
    delay: &mut D,
    mut op: impl AsyncFnMut(u8) -> Outcome<T, E>,
) -> Result<T, RetryError<E>>
where
    D: DelayNs,
{
    for attempt in 0..policy.attempts {
        let backoff_ms = match op(attempt).await {
            Outcome::Done(value) => return Ok(value),
            Outcome::Abort(e) => return Err(RetryError::Aborted(e)),
            Outcome::Retry => policy.delay_ms,
            Outcome::RetryAfter(ms) => ms,
        };

        if attempt + 1 < policy.attempts && backoff_ms > 0 {
            delay.delay_ms(backoff_ms).await;
        }
    }

    Err(RetryError::Exhausted)
}
