//! Click cascades
//!
//! A cascade is an ordered list of (element, delivery method) pairs. Each is
//! tried in turn until one both delivers and produces the expected effect.

use std::{future::Future, time::Duration};

use cdp_adapter::{ClickMethod, Driver, ElementRef};
use tracing::debug;

use crate::{errors::ActionError, pacing::Pacer};

/// One step of a click cascade.
#[derive(Clone, Debug)]
pub struct ClickAttempt {
    pub element: ElementRef,
    pub method: ClickMethod,
    pub label: &'static str,
}

impl ClickAttempt {
    pub fn new(element: ElementRef, method: ClickMethod, label: &'static str) -> Self {
        Self {
            element,
            method,
            label,
        }
    }
}

/// Same element under several delivery methods.
pub fn cascade_for(element: &ElementRef, methods: &[ClickMethod]) -> Vec<ClickAttempt> {
    methods
        .iter()
        .map(|method| ClickAttempt::new(element.clone(), *method, method.name()))
        .collect()
}

/// Try each attempt until one is delivered and `verify` confirms its effect.
///
/// Steps:
/// 1. Click with the attempt's method; delivery errors fall through to the next attempt.
/// 2. Pause `settle` (scaled by the pacer).
/// 3. Ask `verify`; `true` ends the cascade with that attempt's label.
///
/// Returns `NotClickable` when nothing could be delivered, otherwise
/// `VerificationFailed` carrying `what`.
pub async fn click_until<V, Fut>(
    driver: &dyn Driver,
    pacer: &Pacer,
    what: &str,
    attempts: &[ClickAttempt],
    settle: Duration,
    mut verify: V,
) -> Result<&'static str, ActionError>
where
    V: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ActionError>>,
{
    let mut delivered = false;
    for attempt in attempts {
        pacer.check()?;
        if let Err(err) = driver.click(&attempt.element, attempt.method).await {
            debug!(target: "click", what, strategy = attempt.label, error = %err, "click not delivered");
            continue;
        }
        delivered = true;
        pacer.pause(settle).await?;
        match verify().await {
            Ok(true) => {
                debug!(target: "click", what, strategy = attempt.label, "click verified");
                return Ok(attempt.label);
            }
            Ok(false) => {
                debug!(target: "click", what, strategy = attempt.label, "click had no effect");
            }
            Err(err) => {
                debug!(target: "click", what, strategy = attempt.label, error = %err, "verification probe failed");
            }
        }
    }
    if delivered {
        Err(ActionError::verification(what, "effect after click", "no change"))
    } else {
        Err(ActionError::NotClickable(what.to_string()))
    }
}

/// First attempt whose click is delivered, without effect verification.
pub async fn click_first(
    driver: &dyn Driver,
    pacer: &Pacer,
    what: &str,
    attempts: &[ClickAttempt],
) -> Result<&'static str, ActionError> {
    click_until(driver, pacer, what, attempts, Duration::ZERO, || async {
        Ok(true)
    })
    .await
}
