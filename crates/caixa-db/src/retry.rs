//! # Read Retry
//!
//! Bounded exponential backoff for read-only queries.
//!
//! ```text
//!   attempt 1 ──► transient error ──► sleep 50ms
//!   attempt 2 ──► transient error ──► sleep 100ms
//!   ...
//!   attempt 1 + max_retries ──► give up, return the last error
//!
//!   non-transient error ──► returned immediately
//! ```
//!
//! Mutations never go through here: retrying an open or an entry could
//! double-apply it, so the caller owns that decision.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use crate::error::DbResult;

/// How many times, and how patiently, a read is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of retries.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
                    warn!(
                        operation = what,
                        attempt,
                        ?delay,
                        error = %e,
                        "Transient failure on read, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
