//! Dataset acquisition controller

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use action_locator::RuntimeDeps;
use action_primitives::{
    wait_until, ActionError, RetryDecision, RetryPolicy, SettleRange, POLL_INTERVAL,
};
use fundstat_core_types::{DatasetConfig, DatasetOutcome, DownloadRecord};
use serde::{Deserialize, Serialize};
use tool_click::ActionButton;
use tool_radio_group::RadioDriver;
use tool_select_option::{DropdownDriver, DropdownTimings};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    detector::{DetectorSettings, DownloadDetector},
    errors::AcquireError,
    site::{SiteProfile, ALL, ANY_RADIO, FORM_PLACEHOLDER, HEADER_ROWS, MONTHLY, PLACEHOLDER_LIMIT},
};

/// Waits and budgets for one dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireSettings {
    /// Whole-sequence attempts per dataset.
    pub retry: RetryPolicy,
    pub results_ms: u64,
    pub form_ready_ms: u64,
    pub download_ms: u64,
    /// Pause between filling the form and searching.
    pub before_search: SettleRange,
    /// Pause after search results appear, before exporting.
    pub before_export: SettleRange,
    /// Pause after the download was moved into place.
    pub after_download: SettleRange,
    pub dropdown: DropdownTimings,
    pub detector: DetectorSettings,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            results_ms: 15_000,
            form_ready_ms: 20_000,
            download_ms: 120_000,
            before_search: SettleRange::new(1_000, 2_000),
            before_export: SettleRange::new(2_000, 3_000),
            after_download: SettleRange::new(3_000, 5_000),
            dropdown: DropdownTimings::default(),
            detector: DetectorSettings::default(),
        }
    }
}

impl AcquireSettings {
    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }
}

/// Result of [`AcquisitionController::acquire`].
#[derive(Clone, Debug)]
pub struct AcquireReport {
    pub outcome: DatasetOutcome,
    pub download: Option<DownloadRecord>,
    /// Set when the session can no longer be used (browser gone or run
    /// cancelled).
    pub session_lost: bool,
    pub last_error: Option<String>,
    pub latency_ms: u64,
}

/// Runs the per-dataset sequence on one navigated session.
///
/// Exports land in `staging` (private to the session); the finished file is
/// moved to `{output_dir}/{output_name}.xls`, which transfers its ownership to
/// the dataset.
pub struct AcquisitionController<'a> {
    deps: RuntimeDeps<'a>,
    site: &'a SiteProfile,
    settings: &'a AcquireSettings,
    detector: DownloadDetector,
    output_dir: PathBuf,
}

impl<'a> AcquisitionController<'a> {
    pub fn new(
        deps: RuntimeDeps<'a>,
        site: &'a SiteProfile,
        settings: &'a AcquireSettings,
        staging: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            deps,
            site,
            settings,
            detector: DownloadDetector::new(staging, settings.detector.clone()),
            output_dir: output_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        self.detector.dir()
    }

    /// Acquire one dataset. Never fails: errors drive the per-dataset retry
    /// and end up in the report.
    #[instrument(skip_all, fields(dataset = %config.name))]
    pub async fn acquire(&self, config: &DatasetConfig) -> AcquireReport {
        let started = Instant::now();
        let mut attempts = 0;
        let result = self
            .settings
            .retry
            .run_if(
                self.deps.pacer,
                &config.name,
                |attempt| {
                    attempts = attempt;
                    self.attempt(config, attempt)
                },
                |err: &AcquireError| {
                    if err.is_retryable() {
                        RetryDecision::Retry
                    } else {
                        RetryDecision::Abort
                    }
                },
            )
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(record) => {
                info!(target: "acquire", attempts, latency_ms, file = %record.target.display(), "dataset acquired");
                AcquireReport {
                    outcome: DatasetOutcome::new(&config.name, true, attempts),
                    download: Some(record),
                    session_lost: false,
                    last_error: None,
                    latency_ms,
                }
            }
            Err(err) => {
                error!(target: "acquire", attempts, error = %err, "dataset failed after retries");
                AcquireReport {
                    outcome: DatasetOutcome::new(&config.name, false, attempts),
                    download: None,
                    session_lost: err.is_fatal() || matches!(err, AcquireError::Cancelled),
                    last_error: Some(err.to_string()),
                    latency_ms,
                }
            }
        }
    }

    async fn attempt(
        &self,
        config: &DatasetConfig,
        attempt: u32,
    ) -> Result<DownloadRecord, AcquireError> {
        info!(target: "acquire", attempt, "starting attempt");
        let outcome = self.run_sequence(config).await;
        if let Err(err) = &outcome {
            warn!(target: "acquire", attempt, error = %err, severity = err.severity(), "attempt failed");
            if !err.is_fatal() {
                self.deps
                    .diagnostics
                    .capture(self.deps.driver, &format!("{}_error_{attempt}", config.name))
                    .await;
                if let Err(err) = self.deps.frames.reenter(self.deps.driver).await {
                    debug!(target: "acquire", error = %err, "frame re-entry after failure failed");
                }
            }
        }
        outcome
    }

    /// Steps:
    /// 1. Restore the frame; dismiss a leftover dialog.
    /// 2. Period, fund type (re-identified by its options), region, fund
    ///    category, public/private scope and periodicity.
    /// 3. Baseline the staging directory, search, check for result rows.
    /// 4. Export, wait for the finished file and move it into place.
    /// 5. Dismiss the post-download dialog and restore the frame.
    async fn run_sequence(&self, config: &DatasetConfig) -> Result<DownloadRecord, AcquireError> {
        let driver = self.deps.driver;
        let pacer = self.deps.pacer;
        let settings = self.settings;
        let site = self.site;

        self.deps.frames.ensure_context(driver).await;
        if driver.accept_dialog().await.map_err(ActionError::from)? {
            info!(target: "acquire", "dismissed leftover dialog");
        }

        let dropdown = DropdownDriver::new(self.deps).with_timings(settings.dropdown.clone());
        let radios = RadioDriver::new(self.deps);

        let period = config.window.period_label();
        dropdown
            .select(&site.period, &period)
            .await
            .map_err(|err| AcquireError::dropdown("period", err))?;

        let fund_type = dropdown
            .identify(&site.fund_type_probe, &site.fund_type_fallback, "fund_type_control")
            .await
            .map_err(|err| AcquireError::dropdown("fund_type", err))?;
        dropdown
            .select(&fund_type, &config.fund_type_key)
            .await
            .map_err(|err| AcquireError::dropdown("fund_type", err))?;

        self.wait_form_ready().await?;
        radios
            .select(&site.region, &config.region_key)
            .await
            .map_err(|err| AcquireError::radio("region", err))?;
        dropdown
            .select(&site.fund_category, &config.fund_universe_key)
            .await
            .map_err(|err| AcquireError::dropdown("fund_category", err))?;
        radios
            .select(&site.scope, ALL)
            .await
            .map_err(|err| AcquireError::radio("public_private", err))?;
        radios
            .select(&site.periodicity, MONTHLY)
            .await
            .map_err(|err| AcquireError::radio("periodicity", err))?;

        let baseline = self.detector.snapshot().await?;
        debug!(target: "acquire", files = baseline.len(), "download baseline taken");

        pacer.settle(settings.before_search).await?;
        let buttons = ActionButton::new(self.deps);
        buttons
            .click(&site.search)
            .await
            .map_err(|err| AcquireError::click("search_button", err))?;
        if !self.results_present().await? {
            warn!(
                target: "acquire",
                dataset = %config.name,
                "no search results; probable bot detection, exporting anyway"
            );
            self.deps
                .diagnostics
                .snapshot_source(driver, &format!("debug_search_no_data_{}", config.name))
                .await;
        }

        pacer.settle(settings.before_export).await?;
        buttons
            .click(&site.export)
            .await
            .map_err(|err| AcquireError::click("export_button", err))?;

        let downloaded = self
            .detector
            .await_new_file(&baseline, AcquireSettings::ms(settings.download_ms), pacer)
            .await?;
        let target = self.output_dir.join(config.file_name());
        move_into_place(&downloaded, &target).await?;
        info!(target: "acquire", from = %downloaded.display(), to = %target.display(), "download renamed");

        pacer.settle(settings.after_download).await?;
        if driver.accept_dialog().await.map_err(ActionError::from)? {
            debug!(target: "acquire", "dismissed post-download dialog");
        }
        self.deps.frames.reenter(driver).await?;

        Ok(DownloadRecord {
            source: downloaded,
            target,
            dataset: config.name.clone(),
            success: true,
        })
    }

    /// Wait until the lazy form has rendered: few placeholders left and at
    /// least one visible radio. Timing out is logged, not fatal.
    async fn wait_form_ready(&self) -> Result<(), AcquireError> {
        let driver = self.deps.driver;
        let placeholders = cdp_adapter::Locator::xpath(FORM_PLACEHOLDER);
        let radios = cdp_adapter::Locator::xpath(ANY_RADIO);
        let ready = wait_until(
            self.deps.pacer,
            "form ready",
            AcquireSettings::ms(self.settings.form_ready_ms),
            POLL_INTERVAL,
            || async {
                let pending = driver.find_all(&placeholders).await?.len();
                if pending >= PLACEHOLDER_LIMIT {
                    return Ok(None);
                }
                for radio in driver.find_all(&radios).await? {
                    if driver.is_displayed(&radio).await? {
                        return Ok(Some(pending));
                    }
                }
                Ok(None)
            },
        )
        .await;
        match ready {
            Ok(pending) => {
                debug!(target: "acquire", placeholders = pending, "form ready");
                Ok(())
            }
            Err(ActionError::WaitTimeout(what)) => {
                warn!(target: "acquire", %what, "form readiness not confirmed, continuing");
                Ok(())
            }
            Err(ActionError::Interrupted(_)) => Err(AcquireError::Cancelled),
            Err(err) => Err(err.into()),
        }
    }

    /// Data rows beyond the header, or a "총 N건" counter.
    async fn results_present(&self) -> Result<bool, AcquireError> {
        let driver = self.deps.driver;
        let rows = self.site.result_rows();
        let counter = self.site.result_counter();
        let found = wait_until(
            self.deps.pacer,
            "search results",
            AcquireSettings::ms(self.settings.results_ms),
            POLL_INTERVAL,
            || async {
                let count = driver.find_all(&rows).await?.len();
                if count > HEADER_ROWS {
                    return Ok(Some(format!("{count} rows")));
                }
                for element in driver.find_all(&counter).await? {
                    let text = driver.text(&element).await?;
                    if text.contains('총') && text.contains('건') {
                        return Ok(Some(text));
                    }
                }
                Ok(None)
            },
        )
        .await;
        match found {
            Ok(evidence) => {
                info!(target: "acquire", %evidence, "search results loaded");
                Ok(true)
            }
            Err(ActionError::WaitTimeout(_)) => Ok(false),
            Err(ActionError::Interrupted(_)) => Err(AcquireError::Cancelled),
            Err(err) => Err(err.into()),
        }
    }
}

/// Move `source` over `target`; a stale export is replaced in one step.
async fn move_into_place(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(source, target).await
}
