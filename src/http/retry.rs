use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

/// Bounded exponential backoff with jitter.
///
/// Attempt `n` (zero based) waits `base_delay * 2^n`, capped at `max_delay`,
/// plus a random `0..=max_jitter` before the next try.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.max_jitter = Duration::ZERO;
        self
    }

    /// Delay to wait after the given failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        backoff + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }
}

/// Rate limiting and server errors are worth another try; other statuses are final.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Anything carrying an HTTP status, so transports can be swapped in tests.
pub trait HasStatus {
    fn status(&self) -> StatusCode;
}

impl HasStatus for Response {
    fn status(&self) -> StatusCode {
        Response::status(self)
    }
}

/// Run `send` until it yields a final response or the retry budget is spent.
///
/// Makes at most `max_retries + 1` attempts. A retryable status on the last
/// attempt is returned as-is for the caller to inspect; a transport error on
/// the last attempt is propagated.
pub async fn retry_with_backoff<F, Fut, R, E>(policy: &RetryPolicy, mut send: F) -> Result<R, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: HasStatus,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable(status) {
                    return Ok(response);
                }
                if attempt >= policy.max_retries {
                    warn!("Giving up after {} attempts, last status {}", attempt + 1, status);
                    return Ok(response);
                }
                warn!(
                    "Request returned {} (attempt {}/{}), retrying",
                    status,
                    attempt + 1,
                    policy.max_retries + 1
                );
            }
            Err(e) => {
                if attempt >= policy.max_retries {
                    return Err(e);
                }
                warn!(
                    "Request failed (attempt {}/{}): {}",
                    attempt + 1,
                    policy.max_retries + 1,
                    e
                );
            }
        }

        let delay = policy.delay_for(attempt);
        debug!("Waiting {:?} before retry", delay);
        sleep(delay).await;
        attempt += 1;
    }
}

/// Send the request produced by `build` with [`retry_with_backoff`].
///
/// `build` is called once per attempt since a sent request cannot be reused.
pub async fn request_with_retry<F>(policy: &RetryPolicy, build: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(policy, || build().send()).await
}
