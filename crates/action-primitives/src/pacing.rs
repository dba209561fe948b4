//! Settle-interval pacing.
//!
//! The target site reacts badly to machine-speed interaction, so every UI step
//! is followed by a randomized pause. All sleeps go through a [`Pacer`] so a
//! cancelled run stops at the next suspension point.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::errors::ActionError;

/// Inclusive randomized pause range in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl SettleRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn sample(&self) -> Duration {
        let ms = if self.max_ms <= self.min_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

/// Sleeps scaled by a pacing factor and interruptible by a cancellation token.
#[derive(Clone, Debug)]
pub struct Pacer {
    scale: f64,
    cancel: CancellationToken,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(1.0, CancellationToken::new())
    }
}

impl Pacer {
    pub fn new(scale: f64, cancel: CancellationToken) -> Self {
        Self {
            scale: scale.max(0.0),
            cancel,
        }
    }

    /// No settle or retry delays at all.
    pub fn immediate() -> Self {
        Self::new(0.0, CancellationToken::new())
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Same cancellation scope with a different pacing factor.
    pub fn with_scale(&self, scale: f64) -> Self {
        Self::new(scale, self.cancel.clone())
    }

    pub fn scaled(&self, duration: Duration) -> Duration {
        duration.mul_f64(self.scale)
    }

    pub fn check(&self) -> Result<(), ActionError> {
        if self.cancel.is_cancelled() {
            return Err(ActionError::Interrupted("run cancelled".into()));
        }
        Ok(())
    }

    /// Randomized settle pause.
    pub async fn settle(&self, range: SettleRange) -> Result<(), ActionError> {
        self.pause(range.sample()).await
    }

    /// Scaled pause.
    pub async fn pause(&self, duration: Duration) -> Result<(), ActionError> {
        self.tick(self.scaled(duration)).await
    }

    /// Unscaled pause, used for polling intervals.
    pub async fn tick(&self, duration: Duration) -> Result<(), ActionError> {
        self.check()?;
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ActionError::Interrupted("run cancelled".into())),
            _ = sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stays_in_range() {
        let range = SettleRange::new(4_000, 6_000);
        for _ in 0..50 {
            let sample = range.sample();
            assert!(sample >= Duration::from_millis(4_000));
            assert!(sample <= Duration::from_millis(6_000));
        }
        assert_eq!(SettleRange::new(9, 3).sample(), Duration::from_millis(9));
    }

    #[test]
    fn test_zero_scale_skips_settles() {
        let pacer = Pacer::immediate();
        tokio_test::block_on(async {
            pacer.settle(SettleRange::new(5_000, 7_000)).await.unwrap();
        });
        assert_eq!(pacer.scaled(Duration::from_secs(3)), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pause() {
        let pacer = Pacer::default();
        let token = pacer.cancel_token().clone();
        let handle = tokio::spawn({
            let pacer = pacer.clone();
            async move { pacer.pause(Duration::from_secs(60)).await }
        });
        token.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ActionError::Interrupted(_))));
    }
}
