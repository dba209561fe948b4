//! Navigation sequencer

use std::time::{Duration, Instant};

use action_locator::{
    ElementResolver, Interactable, LocatorError, NoDiagnostics, ResolveOptions, RuntimeDeps,
};
use action_primitives::{wait_until, ActionError, RetryPolicy, POLL_INTERVAL};
use tool_click::{ActionButton, ClickError, ClickOpt};
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::NavigationError,
    types::{ExpectLandmark, NavState, NavStep, NavigationFlow, NavigationReport, StepResult},
};

/// Drives a [`NavigationFlow`] on one session.
pub struct NavigationSequencer<'a> {
    deps: RuntimeDeps<'a>,
    click: ClickOpt,
}

impl<'a> NavigationSequencer<'a> {
    pub fn new(deps: RuntimeDeps<'a>) -> Self {
        Self {
            deps,
            click: ClickOpt::default(),
        }
    }

    pub fn with_click_opt(mut self, click: ClickOpt) -> Self {
        self.click = click;
        self
    }

    /// Steps:
    /// 1. Load the entry page.
    /// 2. Enter the content frame, waiting for it to exist, then settle.
    /// 3. For each step: resolve and click the target, settle, and when the
    ///    step expects a landmark, re-click until it shows up.
    ///
    /// Any failure ends the run; the caller decides whether to start over with
    /// a fresh session.
    #[instrument(skip_all, fields(url = %flow.entry_url))]
    pub async fn run(&self, flow: &NavigationFlow) -> Result<NavigationReport, NavigationError> {
        flow.validate()?;
        let started = Instant::now();
        let driver = self.deps.driver;
        let pacer = self.deps.pacer;

        pacer.check().map_err(|_| NavigationError::Cancelled)?;
        info!(target: "flow", step = NavState::EntryLoaded.label(), "loading entry page");
        if let Err(err) = driver.navigate(&flow.entry_url).await {
            return Err(self.fail(NavState::EntryLoaded, err).await);
        }

        let frames = self.deps.frames;
        let entered = wait_until(
            pacer,
            "content frame",
            self.deps.element.timeout,
            POLL_INTERVAL,
            || async {
                match frames.reenter(driver).await {
                    Ok(()) => Ok(Some(())),
                    Err(ActionError::ContextLost(_)) => Ok(None),
                    Err(err) => Err(err),
                }
            },
        )
        .await;
        match entered {
            Ok(()) => {}
            Err(ActionError::Interrupted(_)) => return Err(NavigationError::Cancelled),
            Err(err) => return Err(self.fail(NavState::MainFrameEntered, err).await),
        }
        pacer.settle(flow.frame_settle).await.map_err(cancelled)?;
        info!(target: "flow", step = NavState::MainFrameEntered.label(), frame = %frames.expected(), "entered content frame");

        let mut results = Vec::with_capacity(flow.steps.len());
        let mut reached = NavState::MainFrameEntered;
        for step in &flow.steps {
            let result = self.run_step(step).await?;
            info!(
                target: "flow",
                step = step.state.label(),
                attempts = result.attempts,
                latency_ms = result.latency_ms,
                "navigation step complete"
            );
            reached = step.state;
            results.push(result);
        }

        Ok(NavigationReport {
            reached,
            steps: results,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn run_step(&self, step: &NavStep) -> Result<StepResult, NavigationError> {
        let started = Instant::now();
        let button = ActionButton::new(self.deps).with_opt(self.click.clone());

        let mut attempts = 0;
        let max_attempts = step.expect.as_ref().map_or(1, |expect| expect.max_attempts);
        loop {
            attempts += 1;
            let report = match button.click(&step.target).await {
                Ok(report) => report,
                Err(ClickError::Cancelled) => return Err(NavigationError::Cancelled),
                Err(err) => return Err(self.fail(step.state, err).await),
            };
            self.deps.pacer.settle(step.settle).await.map_err(cancelled)?;

            let Some(expect) = &step.expect else {
                return Ok(StepResult {
                    state: step.state,
                    attempts,
                    locator: Some(report.locator),
                    latency_ms: started.elapsed().as_millis() as u64,
                });
            };
            if self.landmark_visible(expect).await? {
                return Ok(StepResult {
                    state: step.state,
                    attempts,
                    locator: Some(report.locator),
                    latency_ms: started.elapsed().as_millis() as u64,
                });
            }
            if attempts >= max_attempts {
                let reason = format!(
                    "{} not visible after {attempts} click(s)",
                    expect.landmark.name()
                );
                return Err(self.fail(step.state, reason).await);
            }
            warn!(
                target: "flow",
                step = step.state.label(),
                attempt = attempts,
                max_attempts,
                "landmark missing after click, clicking again"
            );
        }
    }

    async fn landmark_visible(&self, expect: &ExpectLandmark) -> Result<bool, NavigationError> {
        let quiet = ElementResolver::new(self.deps.driver, self.deps.pacer, &NoDiagnostics);
        let options = ResolveOptions::new(Duration::from_millis(expect.timeout_ms), RetryPolicy::once());
        match quiet.resolve_where(&expect.landmark, &options, &Interactable).await {
            Ok(_) => Ok(true),
            Err(LocatorError::Interrupted(_)) => Err(NavigationError::Cancelled),
            Err(err) => {
                debug!(target: "flow", landmark = expect.landmark.name(), error = %err, "landmark probe missed");
                Ok(false)
            }
        }
    }

    async fn fail(&self, step: NavState, reason: impl ToString) -> NavigationError {
        let reason = reason.to_string();
        warn!(target: "flow", step = step.label(), %reason, "navigation step failed");
        self.deps
            .diagnostics
            .capture(self.deps.driver, &format!("nav_{}_failed", step.label()))
            .await;
        NavigationError::step_failed(step, reason)
    }
}

fn cancelled(_: ActionError) -> NavigationError {
    NavigationError::Cancelled
}
