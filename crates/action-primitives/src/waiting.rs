//! Polling waits

use std::{future::Future, time::Duration};

use tokio::time::Instant;

use crate::{errors::ActionError, pacing::Pacer};

/// Default interval between probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll `probe` until it yields a value or `timeout` elapses.
///
/// The probe runs at least once, even with a zero timeout. Probe errors end
/// the wait immediately.
pub async fn wait_until<T, F, Fut>(
    pacer: &Pacer,
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, ActionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ActionError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ActionError::WaitTimeout(format!(
                "{what} after {}ms",
                timeout.as_millis()
            )));
        }
        pacer.tick(interval.min(deadline - now)).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_returns_first_ready_value() {
        let polls = AtomicU32::new(0);
        let value = wait_until(
            &Pacer::immediate(),
            "counter",
            Duration::from_secs(1),
            Duration::from_millis(1),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok((n >= 3).then_some(n)) }
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let err = wait_until(
            &Pacer::immediate(),
            "never",
            Duration::from_millis(300),
            Duration::from_millis(50),
            || async { Ok::<Option<()>, ActionError>(None) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ActionError::WaitTimeout(msg) if msg.starts_with("never")));
    }

    #[tokio::test]
    async fn test_zero_timeout_probes_once() {
        let polls = AtomicU32::new(0);
        let result = wait_until(
            &Pacer::immediate(),
            "once",
            Duration::ZERO,
            POLL_INTERVAL,
            || {
                polls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Option<()>, ActionError>(None) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }
}
