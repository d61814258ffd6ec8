//! # Exponential Backoff
//!
//! Bounded retry policy for remote mount operations.
//!
//! The wait sequence is 500ms, 1s, 2s, 4s, ... doubling up to a 60s
//! ceiling, with no jitter. An operation is retried until a computed wait
//! equals the ceiling; at that point the retry budget is exhausted and the
//! last error is returned. A success resets the state so a later,
//! unrelated operation starts fresh at 500ms.
//!
//! ```rust
//! use std::time::Duration;
//! use vault_config_reconciler::reconciler::backoff::ExponentialBackoff;
//!
//! let mut backoff = ExponentialBackoff::remote_ops();
//! assert_eq!(backoff.next_delay(), Duration::from_millis(500));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(1));
//! assert_eq!(backoff.next_delay(), Duration::from_secs(2));
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::client::ClientError;

/// Exponential backoff calculator.
///
/// Each call to [`next_delay`](Self::next_delay) returns the current wait
/// and doubles the next one, capped at the ceiling.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: u32,
    current: Duration,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration, factor: u32) -> Self {
        Self {
            initial,
            max,
            factor,
            current: initial,
        }
    }

    /// The policy used for all mount and tune calls: 500ms initial wait,
    /// doubling, 60s ceiling.
    #[must_use]
    pub fn remote_ops() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(60), 2)
    }

    /// Return the next wait and advance the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current * self.factor, self.max);

        delay
    }

    /// The ceiling. A computed wait equal to this means the budget is
    /// exhausted.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Restart the sequence from the initial wait.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Run `operation` until it succeeds or the backoff budget is exhausted,
/// sleeping between attempts. `what` labels the retry log lines, e.g.
/// `"mounting aws"`.
///
/// The calling task waits through every backoff sleep; a pass tolerates
/// multi-second pauses per retried operation.
pub async fn retry_with_backoff<T, F, Fut>(
    backoff: &mut ExponentialBackoff,
    what: &str,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    loop {
        match operation().await {
            Ok(value) => {
                backoff.reset();
                return Ok(value);
            }
            Err(err) => {
                let delay = backoff.next_delay();
                info!(
                    "error {what}: {err}, waiting {}ms before trying again...",
                    delay.as_millis()
                );

                if delay == backoff.max() {
                    return Err(err);
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}
