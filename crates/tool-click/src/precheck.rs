use action_primitives::{Pacer, SettleRange};
use cdp_adapter::{Driver, ElementRef};
use tracing::warn;

use crate::{errors::ClickError, model::PrecheckSnapshot};

/// Scroll the button into the viewport and read its state.
pub async fn run_precheck(
    driver: &dyn Driver,
    pacer: &Pacer,
    element: &ElementRef,
    settle: SettleRange,
) -> Result<PrecheckSnapshot, ClickError> {
    let scrolled = match driver.scroll_into_view(element).await {
        Ok(()) => {
            pacer.settle(settle).await?;
            true
        }
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => {
            warn!(target: "click", error = %err, "scroll into view failed");
            false
        }
    };
    let visible = driver.is_displayed(element).await?;
    let enabled = driver.is_enabled(element).await?;
    Ok(PrecheckSnapshot {
        visible,
        enabled,
        scrolled,
    })
}
