use cdp_adapter::{Driver, FrameTarget, Locator};
use tracing::{debug, warn};

use crate::errors::ActionError;

/// Keeps the driver addressed at the frame the site's form lives in.
#[derive(Clone, Debug)]
pub struct FrameTracker {
    expected: FrameTarget,
    landmark: Option<Locator>,
}

impl FrameTracker {
    pub fn new(expected: FrameTarget, landmark: Option<Locator>) -> Self {
        Self { expected, landmark }
    }

    pub fn named(frame: impl Into<String>, landmark: Locator) -> Self {
        Self::new(FrameTarget::named(frame), Some(landmark))
    }

    pub fn expected(&self) -> &FrameTarget {
        &self.expected
    }

    pub fn landmark(&self) -> Option<&Locator> {
        self.landmark.as_ref()
    }

    /// Whether the driver currently addresses the expected frame and, when
    /// configured, the landmark is present there.
    pub async fn probe(&self, driver: &dyn Driver) -> bool {
        if driver.current_frame().await != self.expected {
            return false;
        }
        match &self.landmark {
            Some(landmark) => matches!(driver.find(landmark).await, Ok(Some(_))),
            None => true,
        }
    }

    /// Restore the expected context when the landmark probe fails.
    ///
    /// Never fails: a restoration problem is logged and will surface through
    /// the next lookup instead.
    pub async fn ensure_context(&self, driver: &dyn Driver) {
        if self.probe(driver).await {
            return;
        }
        debug!(target: "frame", expected = %self.expected, "context drifted, re-entering");
        if let Err(err) = self.reenter(driver).await {
            warn!(target: "frame", expected = %self.expected, error = %err, "context restoration failed");
        }
    }

    /// Reset to the document root and enter the expected frame.
    pub async fn reenter(&self, driver: &dyn Driver) -> Result<(), ActionError> {
        driver.switch_to_frame(&FrameTarget::Root).await?;
        if self.expected != FrameTarget::Root {
            driver
                .switch_to_frame(&self.expected)
                .await
                .map_err(|err| ActionError::ContextLost(format!("{}: {err}", self.expected)))?;
        }
        Ok(())
    }

    /// Address the top-level document.
    pub async fn escape_to_root(&self, driver: &dyn Driver) -> Result<(), ActionError> {
        driver.switch_to_frame(&FrameTarget::Root).await?;
        Ok(())
    }
}
