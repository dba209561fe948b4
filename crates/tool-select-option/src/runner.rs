use std::time::Duration;

use action_locator::{
    ElementResolver, Interactable, LocatorError, LocatorSet, NoDiagnostics, ResolveOptions,
    RuntimeDeps,
};
use action_primitives::{
    cascade_for, click_until, wait_until, ActionError, ClickAttempt, RetryDecision, RetryPolicy,
    POLL_INTERVAL,
};
use cdp_adapter::{ClickMethod, ElementRef, Locator};
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::DropdownError,
    locators::{listbox_locator, option_exact_xpaths, option_substring_xpaths, CURRENT_TEXT_XPATH},
    model::{DropdownTimings, SelectOutcome},
};

/// Option list located after opening a control.
pub(crate) struct OpenList {
    pub element: ElementRef,
    /// The list lives in the document root and the driver was switched there.
    pub escaped: bool,
}

/// Drives synthetic dropdowns.
///
/// States per attempt: Closed -> Opening -> Open -> Searching ->
/// (Found -> Selecting -> Verifying -> Closed) | (NotFound -> Closing).
/// Any failure restarts from Closed with the frame context restored, up to
/// the retry budget.
pub struct DropdownDriver<'a> {
    pub(crate) deps: RuntimeDeps<'a>,
    pub(crate) timings: DropdownTimings,
    retry: RetryPolicy,
}

impl<'a> DropdownDriver<'a> {
    pub fn new(deps: RuntimeDeps<'a>) -> Self {
        Self {
            deps,
            timings: DropdownTimings::default(),
            retry: RetryPolicy::new(3, 2_000, 0),
        }
    }

    pub fn with_timings(mut self, timings: DropdownTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Make `target` the displayed value of the control found through `control`.
    #[instrument(skip_all, fields(control = control.name(), option = target))]
    pub async fn select(
        &self,
        control: &LocatorSet,
        target: &str,
    ) -> Result<SelectOutcome, DropdownError> {
        self.retry
            .run_if(
                self.deps.pacer,
                control.name(),
                |attempt| self.attempt(control, target, attempt),
                |err: &DropdownError| {
                    if err.is_retryable() {
                        RetryDecision::Retry
                    } else {
                        RetryDecision::Abort
                    }
                },
            )
            .await
    }

    async fn attempt(
        &self,
        control: &LocatorSet,
        target: &str,
        attempt: u32,
    ) -> Result<SelectOutcome, DropdownError> {
        let driver = self.deps.driver;
        self.deps.frames.ensure_context(driver).await;
        let outcome = self.run_states(control, target, attempt).await;
        if let Err(err) = &outcome {
            warn!(target: "dropdown", attempt, error = %err, "dropdown attempt failed");
            self.deps
                .diagnostics
                .capture(driver, &format!("{}_select_error_attempt_{attempt}", control.name()))
                .await;
            if let Err(err) = self.deps.frames.reenter(driver).await {
                debug!(target: "dropdown", error = %err, "frame re-entry after failure failed");
            }
        }
        outcome
    }

    async fn run_states(
        &self,
        control: &LocatorSet,
        target: &str,
        attempt: u32,
    ) -> Result<SelectOutcome, DropdownError> {
        let driver = self.deps.driver;
        let element = self.locate_control(control).await?;

        let current = self.displayed_value(&element).await?;
        if current == target {
            info!(target: "dropdown", value = %current, "already set, skipping");
            return Ok(SelectOutcome::AlreadySet);
        }
        debug!(target: "dropdown", current = %current, "opening");

        let list = self.open(&element).await?;

        let Some((option, scrolls)) = self.search(&list.element, target).await? else {
            self.close(&element, &list).await;
            return Err(DropdownError::OptionNotFound {
                option: target.to_string(),
                scrolls: self.timings.max_wheel_steps,
            });
        };

        let attempts = [
            ClickAttempt::new(option.clone(), ClickMethod::Direct, "direct"),
            ClickAttempt::new(option, ClickMethod::Synthetic, "synthetic"),
        ];
        let picked = click_until(
            driver,
            self.deps.pacer,
            "dropdown option",
            &attempts,
            self.timings.click_settle.sample(),
            || self.value_is(&element, target),
        )
        .await;
        if let Err(err) = &picked {
            debug!(target: "dropdown", error = %err, "option click did not register");
        }

        if list.escaped {
            self.deps.frames.reenter(driver).await?;
        }

        let after = self.displayed_value(&element).await?;
        if after != target {
            return Err(ActionError::verification("dropdown value", target, after).into());
        }
        info!(target: "dropdown", attempt, scrolls, "selection verified");
        Ok(SelectOutcome::Selected { attempt, scrolls })
    }

    /// Visible instance first, then any present one.
    pub(crate) async fn locate_control(&self, control: &LocatorSet) -> Result<ElementRef, DropdownError> {
        let quiet = ElementResolver::new(self.deps.driver, self.deps.pacer, &NoDiagnostics);
        match quiet
            .resolve_where(control, &ResolveOptions::probe(), &Interactable)
            .await
        {
            Ok(found) => return Ok(found.element),
            Err(LocatorError::ElementNotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }
        Ok(self
            .deps
            .resolver()
            .resolve(control, &self.deps.element)
            .await?
            .element)
    }

    pub(crate) async fn displayed_value(&self, control: &ElementRef) -> Result<String, DropdownError> {
        let driver = self.deps.driver;
        let inner = driver
            .find_within(control, &Locator::xpath(CURRENT_TEXT_XPATH))
            .await?;
        let text = match inner.first() {
            Some(text_el) => driver.text(text_el).await?,
            None => driver.text(control).await?,
        };
        Ok(text.trim().to_string())
    }

    async fn value_is(&self, control: &ElementRef, target: &str) -> Result<bool, ActionError> {
        match self.displayed_value(control).await {
            Ok(value) => Ok(value == target),
            Err(DropdownError::Action(err)) => Err(err),
            Err(other) => Err(ActionError::Internal(other.to_string())),
        }
    }

    async fn expanded(&self, control: &ElementRef) -> Result<bool, ActionError> {
        Ok(self
            .deps
            .driver
            .attribute(control, "aria-expanded")
            .await?
            .as_deref()
            == Some("true"))
    }

    /// Opening -> Open. Leaves the driver addressing the list's document.
    pub(crate) async fn open(&self, control: &ElementRef) -> Result<OpenList, DropdownError> {
        let driver = self.deps.driver;
        let pacer = self.deps.pacer;

        if self.expanded(control).await? {
            debug!(target: "dropdown", "already expanded, closing first");
            driver.synthetic_click(control).await?;
            pacer.settle(self.timings.click_settle).await?;
        }
        driver.scroll_into_view(control).await?;
        pacer.settle(self.timings.click_settle).await?;

        let open_wait = self.timings.open_wait();
        let used = click_until(
            driver,
            pacer,
            "dropdown toggle",
            &cascade_for(
                control,
                &[ClickMethod::Pointer, ClickMethod::Synthetic, ClickMethod::Direct],
            ),
            Duration::ZERO,
            || async move {
                let opened = wait_until(pacer, "aria-expanded", open_wait, POLL_INTERVAL, || async {
                    Ok(self.expanded(control).await?.then_some(()))
                })
                .await;
                match opened {
                    Ok(()) => Ok(true),
                    Err(ActionError::WaitTimeout(_)) => Ok(false),
                    Err(err) => Err(err),
                }
            },
        )
        .await
        .map_err(|err| match err {
            ActionError::Interrupted(_) => DropdownError::Cancelled,
            other => DropdownError::OpenFailed(other.to_string()),
        })?;
        debug!(target: "dropdown", strategy = used, "opened");

        let list = self.find_list().await?;
        // Lists keep their previous scroll offset between openings.
        if let Err(err) = driver
            .execute_script("arguments[0].scrollTop = 0;", std::slice::from_ref(&list.element))
            .await
        {
            debug!(target: "dropdown", error = %err, "listbox scroll reset failed");
        }
        Ok(list)
    }

    async fn find_list(&self) -> Result<OpenList, DropdownError> {
        let driver = self.deps.driver;
        let wait = self.timings.listbox_wait();
        if let Some(element) = self.poll_list(wait).await? {
            return Ok(OpenList {
                element,
                escaped: false,
            });
        }
        debug!(target: "dropdown", "list not in current context, trying document root");
        self.deps.frames.escape_to_root(driver).await?;
        if let Some(element) = self.poll_list(wait).await? {
            return Ok(OpenList {
                element,
                escaped: true,
            });
        }
        self.deps.frames.reenter(driver).await?;
        Err(DropdownError::ListboxMissing)
    }

    async fn poll_list(&self, wait: Duration) -> Result<Option<ElementRef>, DropdownError> {
        let driver = self.deps.driver;
        let locator = listbox_locator();
        let found = wait_until(self.deps.pacer, "option list", wait, POLL_INTERVAL, || async {
            match driver.find(&locator).await {
                Ok(found) => Ok(found),
                Err(err) if err.is_fatal() => Err(err.into()),
                Err(_) => Ok(None),
            }
        })
        .await;
        match found {
            Ok(element) => Ok(Some(element)),
            Err(ActionError::WaitTimeout(_)) => Ok(None),
            Err(ActionError::Interrupted(_)) => Err(DropdownError::Cancelled),
            Err(err) => Err(err.into()),
        }
    }

    /// Closing after a failed search. Best effort.
    pub(crate) async fn close(&self, control: &ElementRef, list: &OpenList) {
        let driver = self.deps.driver;
        if list.escaped {
            if let Err(err) = self.deps.frames.reenter(driver).await {
                debug!(target: "dropdown", error = %err, "frame re-entry before close failed");
            }
        }
        if let Err(err) = driver.synthetic_click(control).await {
            debug!(target: "dropdown", error = %err, "close click failed");
        }
        let _ = self.deps.pacer.settle(self.timings.click_settle).await;
    }

    /// Searching: exact matches among rendered options, wheel-scrolling the
    /// list between passes; substring matches once the wheel budget is spent.
    async fn search(
        &self,
        list: &ElementRef,
        target: &str,
    ) -> Result<Option<(ElementRef, u32)>, DropdownError> {
        let driver = self.deps.driver;
        let exact = option_exact_xpaths(target);
        let mut scrolls = 0;
        loop {
            if let Some(option) = self.first_match(list, &exact).await? {
                debug!(target: "dropdown", scrolls, "option found");
                return Ok(Some((option, scrolls)));
            }
            if scrolls >= self.timings.max_wheel_steps {
                break;
            }
            if let Err(err) = driver.wheel(list, self.timings.wheel_delta).await {
                debug!(target: "dropdown", error = %err, "wheel scroll failed");
                break;
            }
            scrolls += 1;
            self.deps.pacer.tick(self.timings.wheel_pause()).await?;
        }
        let loose = self.first_match(list, &option_substring_xpaths(target)).await?;
        if loose.is_some() {
            debug!(target: "dropdown", scrolls, "option found by substring");
        }
        Ok(loose.map(|option| (option, scrolls)))
    }

    async fn first_match(
        &self,
        list: &ElementRef,
        exprs: &[String],
    ) -> Result<Option<ElementRef>, DropdownError> {
        for expr in exprs {
            let found = self
                .deps
                .driver
                .find_within(list, &Locator::xpath(expr.as_str()))
                .await?;
            if let Some(option) = found.into_iter().next() {
                return Ok(Some(option));
            }
        }
        Ok(None)
    }
}
