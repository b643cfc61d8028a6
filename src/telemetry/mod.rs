#![allow(async_fn_in_trait)]

#[cfg(feature = "esp32")]
pub mod adafruit;
pub mod http;

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::constants::{RATE_LIMIT_BACKOFF_MS, UPLOAD_ATTEMPTS, UPLOAD_RETRY_DELAY_MS};
use crate::reading::FeedValue;
use crate::retry::{Outcome, RetryError, RetryPolicy, retry};

/// HTTP status accepted as a successful upload
pub const HTTP_OK: u16 = 200;
/// HTTP status returned when the feed API throttles the client
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Publishes a single value to a named feed.
pub trait FeedClient {
    type Error: Debug;

    /// Send one value and return the HTTP status code. The connection used
    /// for the request is released before returning.
    async fn publish(&mut self, feed: &str, value: &str) -> Result<u16, Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Attempts per feed
    pub attempts: u8,
    /// Backoff after a non-200, non-429 response
    pub retry_delay_ms: u32,
    /// Backoff after a 429 response
    pub rate_limit_backoff_ms: u32,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            attempts: UPLOAD_ATTEMPTS,
            retry_delay_ms: UPLOAD_RETRY_DELAY_MS,
            rate_limit_backoff_ms: RATE_LIMIT_BACKOFF_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub delivered: u8,
    pub failed: u8,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Upload every feed value in order.
///
/// Each feed gets `policy.attempts` tries. A feed that keeps failing is
/// counted and skipped, the remaining feeds are still sent. A rate limit on
/// the last attempt of a feed still delays the next feed.
pub async fn upload<C, D>(
    client: &mut C,
    delay: &mut D,
    payload: &[FeedValue],
    policy: UploadPolicy,
) -> UploadReport
where
    C: FeedClient,
    D: DelayNs,
{
    let mut report = UploadReport::default();

    for (index, entry) in payload.iter().enumerate() {
        info!("Sending {}: {}", entry.feed, entry.value);

        let mut rate_limited = false;
        let result: Result<(), RetryError<Infallible>> = retry(
            RetryPolicy::new(policy.attempts, policy.retry_delay_ms),
            delay,
            async |attempt: u8| {
                let status = client.publish(entry.feed, &entry.value).await;
                rate_limited = matches!(status, Ok(HTTP_TOO_MANY_REQUESTS));
                match status {
                    Ok(HTTP_OK) => {
                        debug!("Data sent to {} successfully", entry.feed);
                        Outcome::Done(())
                    }
                    Ok(HTTP_TOO_MANY_REQUESTS) => {
                        warn!(
                            "Rate limited sending {}, waiting {} ms (attempt {}/{})",
                            entry.feed,
                            policy.rate_limit_backoff_ms,
                            attempt + 1,
                            policy.attempts
                        );
                        Outcome::RetryAfter(policy.rate_limit_backoff_ms)
                    }
                    Ok(status) => {
                        warn!(
                            "Failed to send {}, status code: {} (attempt {}/{})",
                            entry.feed,
                            status,
                            attempt + 1,
                            policy.attempts
                        );
                        Outcome::Retry
                    }
                    Err(e) => {
                        warn!(
                            "Error sending {}: {:?} (attempt {}/{})",
                            entry.feed,
                            e,
                            attempt + 1,
                            policy.attempts
                        );
                        Outcome::RetryAfter(0)
                    }
                }
            },
        )
        .await;

        match result {
            Ok(()) => report.delivered += 1,
            Err(_) => {
                warn!("Giving up on feed {}", entry.feed);
                report.failed += 1;
            }
        }

        if rate_limited && index + 1 < payload.len() {
            debug!("Still rate limited, waiting {} ms", policy.rate_limit_backoff_ms);
            delay.delay_ms(policy.rate_limit_backoff_ms).await;
        }
    }

    report
}
