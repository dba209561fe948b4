use action_locator::{AllOf, Disambiguator, Interactable, LocatorError, LocatorSet, RuntimeDeps};
use action_primitives::{click_until, ActionError, ClickAttempt};
use cdp_adapter::{ClickMethod, ElementRef, Locator};
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::RadioError,
    locators::{radio_by_label, INNER_INPUT_XPATH, LABEL_XPATH},
    model::{RadioGroup, RadioOutcome, VerifyPolicy},
};

pub struct RadioDriver<'a> {
    deps: RuntimeDeps<'a>,
}

impl<'a> RadioDriver<'a> {
    pub fn new(deps: RuntimeDeps<'a>) -> Self {
        Self { deps }
    }

    /// Check the radio labelled `label` that belongs to `group`.
    ///
    /// Steps:
    /// 1. Restore the frame context.
    /// 2. Resolve candidates by label, keeping the first that is visible,
    ///    enabled and whose group siblings match the group vocabulary.
    /// 3. Skip when it is already checked.
    /// 4. Click through inner input, the radio itself, its label and finally a
    ///    pointer click, stopping once the checked state flips.
    #[instrument(skip_all, fields(group = %group.name, label = %label))]
    pub async fn select(&self, group: &RadioGroup, label: &str) -> Result<RadioOutcome, RadioError> {
        let driver = self.deps.driver;
        self.deps.frames.ensure_context(driver).await;

        let set = LocatorSet::new(format!("{}_{label}", group.name), vec![radio_by_label(label)]);
        let filter = AllOf(vec![
            Box::new(Interactable) as Box<dyn Disambiguator>,
            Box::new(group.siblings.clone()),
        ]);
        let radio = match self
            .deps
            .resolver()
            .resolve_where(&set, &self.deps.element, &filter)
            .await
        {
            Ok(found) => found.element,
            Err(LocatorError::Interrupted(_)) => return Err(RadioError::Cancelled),
            Err(source) => {
                return Err(RadioError::OptionNotFound {
                    group: group.name.clone(),
                    label: label.to_string(),
                    source,
                })
            }
        };

        if self.is_checked(&radio).await? {
            info!(target: "radio", "already checked");
            return Ok(RadioOutcome::AlreadyChecked);
        }

        let attempts = self.cascade(&radio).await?;
        let outcome = click_until(
            driver,
            self.deps.pacer,
            &set.to_string(),
            &attempts,
            group.click_settle.sample(),
            || self.is_checked(&radio),
        )
        .await;

        match outcome {
            Ok(strategy) => {
                info!(target: "radio", strategy, "radio checked");
                Ok(RadioOutcome::Checked { strategy })
            }
            Err(ActionError::Interrupted(_)) => Err(RadioError::Cancelled),
            Err(err) => {
                self.deps
                    .diagnostics
                    .capture(driver, &format!("radio_{}_{label}_unverified", group.name))
                    .await;
                match group.verify {
                    VerifyPolicy::Strict => {
                        warn!(target: "radio", error = %err, "radio did not become checked");
                        Err(RadioError::Unverified {
                            group: group.name.clone(),
                            label: label.to_string(),
                        })
                    }
                    VerifyPolicy::BestEffort => {
                        warn!(target: "radio", error = %err, "radio state unverified, continuing");
                        Ok(RadioOutcome::Unverified)
                    }
                }
            }
        }
    }

    async fn cascade(&self, radio: &ElementRef) -> Result<Vec<ClickAttempt>, RadioError> {
        let driver = self.deps.driver;
        let mut attempts = Vec::with_capacity(4);
        if let Some(input) = driver
            .find_within(radio, &Locator::xpath(INNER_INPUT_XPATH))
            .await?
            .into_iter()
            .next()
        {
            attempts.push(ClickAttempt::new(input, ClickMethod::Direct, "input"));
        }
        attempts.push(ClickAttempt::new(radio.clone(), ClickMethod::Synthetic, "radio"));
        if let Some(label) = driver
            .find_within(radio, &Locator::xpath(LABEL_XPATH))
            .await?
            .into_iter()
            .next()
        {
            attempts.push(ClickAttempt::new(label, ClickMethod::Direct, "label"));
        }
        attempts.push(ClickAttempt::new(radio.clone(), ClickMethod::Pointer, "pointer"));
        debug!(target: "radio", strategies = attempts.len(), "click cascade prepared");
        Ok(attempts)
    }

    async fn is_checked(&self, radio: &ElementRef) -> Result<bool, ActionError> {
        let driver = self.deps.driver;
        if driver.attribute(radio, "aria-checked").await?.as_deref() == Some("true") {
            return Ok(true);
        }
        match driver.attribute(radio, "checked").await? {
            Some(value) => Ok(value != "false"),
            None => Ok(false),
        }
    }
}
