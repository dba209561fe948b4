//! Bounded retry with jittered delay

use std::{fmt::Display, future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pacing::Pacer;

/// Attempt budget plus a base delay and random jitter between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
            jitter_ms: 2_000,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Abort,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            jitter_ms,
        }
    }

    /// Single attempt, no delay.
    pub const fn once() -> Self {
        Self::new(1, 0, 0)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the attempt following `attempt`.
    pub fn backoff(&self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        Duration::from_millis(self.delay_ms + jitter)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// when every attempt failed or the pacer was cancelled mid-backoff.
    pub async fn run<T, E, F, Fut>(&self, pacer: &Pacer, label: &str, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(pacer, label, op, |_| RetryDecision::Retry).await
    }

    /// Like [`RetryPolicy::run`], but `classify` may stop retrying early.
    pub async fn run_if<T, E, F, Fut, C>(
        &self,
        pacer: &Pacer,
        label: &str,
        mut op: F,
        classify: C,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
    {
        let max = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(target: "retry", label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if attempt >= max || classify(&err) == RetryDecision::Abort {
                        warn!(target: "retry", label, attempt, max, error = %err, "giving up");
                        return Err(err);
                    }
                    let backoff = self.backoff();
                    warn!(
                        target: "retry",
                        label,
                        attempt,
                        max,
                        backoff_ms = pacer.scaled(backoff).as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    if pacer.pause(backoff).await.is_err() {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::new(3, 5_000, 2_000);
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(&Pacer::immediate(), "flaky", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("transient {attempt}"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(2, 0, 0);
        let result: Result<(), String> = policy
            .run(&Pacer::immediate(), "broken", |attempt| async move {
                Err(format!("failure {attempt}"))
            })
            .await;
        assert_eq!(result, Err("failure 2".to_string()));
    }

    #[tokio::test]
    async fn test_abort_classification_stops_early() {
        let policy = RetryPolicy::new(5, 0, 0);
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = policy
            .run_if(
                &Pacer::immediate(),
                "fatal",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal") }
                },
                |_| RetryDecision::Abort,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_within_jitter() {
        let policy = RetryPolicy::new(3, 100, 50);
        for _ in 0..20 {
            let backoff = policy.backoff();
            assert!(backoff >= Duration::from_millis(100));
            assert!(backoff <= Duration::from_millis(150));
        }
        assert_eq!(RetryPolicy::new(0, 0, 0).attempts(), 1);
    }
}
