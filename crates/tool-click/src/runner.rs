use std::time::Instant;

use action_locator::{Interactable, LocatorError, LocatorSet, RuntimeDeps};
use action_primitives::{cascade_for, click_first, ActionError};
use tracing::{info, instrument, warn};

use crate::{
    errors::ClickError,
    model::{ActionReport, ClickOpt},
    precheck,
};

/// Search and export triggers.
pub struct ActionButton<'a> {
    deps: RuntimeDeps<'a>,
    opt: ClickOpt,
}

impl<'a> ActionButton<'a> {
    pub fn new(deps: RuntimeDeps<'a>) -> Self {
        Self {
            deps,
            opt: ClickOpt::default(),
        }
    }

    pub fn with_opt(mut self, opt: ClickOpt) -> Self {
        self.opt = opt;
        self
    }

    /// Click the first visible match of `button`.
    ///
    /// Steps:
    /// 1. Resolve a visible, enabled instance; hidden duplicates are skipped.
    /// 2. Scroll it into the viewport and let the page settle.
    /// 3. Deliver the click through the configured methods until one lands.
    #[instrument(skip_all, fields(button = button.name()))]
    pub async fn click(&self, button: &LocatorSet) -> Result<ActionReport, ClickError> {
        let started = Instant::now();
        let driver = self.deps.driver;
        self.deps.frames.ensure_context(driver).await;

        let resolved = match self
            .deps
            .resolver()
            .resolve_where(button, &self.deps.element, &Interactable)
            .await
        {
            Ok(resolved) => resolved,
            Err(LocatorError::Interrupted(_)) => return Err(ClickError::Cancelled),
            Err(source) => {
                warn!(target: "click", "action button not found");
                return Err(ClickError::ActionButtonNotFound {
                    button: button.name().to_string(),
                    source,
                });
            }
        };

        let snapshot =
            precheck::run_precheck(driver, self.deps.pacer, &resolved.element, self.opt.scroll_settle)
                .await?;

        let strategy = click_first(
            driver,
            self.deps.pacer,
            button.name(),
            &cascade_for(&resolved.element, &self.opt.methods),
        )
        .await
        .map_err(|err| match err {
            ActionError::Interrupted(_) => ClickError::Cancelled,
            ActionError::NotClickable(what) => ClickError::Exhausted(what),
            other => ClickError::Action(other),
        })?;

        info!(target: "click", strategy, locator = %resolved.locator, "action button clicked");
        Ok(ActionReport::new(resolved.locator, strategy, snapshot, started))
    }
}
