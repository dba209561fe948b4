//! One browser context and its lifecycle

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use action_flow::{NavigationReport, NavigationSequencer};
use action_locator::RuntimeDeps;
use action_primitives::FrameTracker;
use async_trait::async_trait;
use cdp_adapter::{Driver, DriverError};
use fundstat_acquisition::{AcquireReport, AcquisitionController};
use fundstat_core_types::{DatasetConfig, DatasetOutcome, SessionId, SessionPhase, SessionResult};
use tracing::{debug, error, info, warn};

use crate::{
    error::SchedulerError,
    model::{OrchestratorConfig, Pass, SessionContext},
};

/// Launches browsers for sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Start a browser for session `index` whose downloads land in `staging`.
    async fn launch(&self, index: usize, staging: &Path) -> Result<Arc<dyn Driver>, DriverError>;
}

/// Exclusive owner of one browser.
///
/// Lifecycle: initializing -> navigated -> acquiring(dataset) -> idle ->
/// closed. [`close`](Self::close) must be awaited on every exit path; a
/// session dropped while still open is logged.
pub struct AcquisitionSession {
    id: SessionId,
    index: usize,
    driver: Arc<dyn Driver>,
    frames: FrameTracker,
    staging: PathBuf,
    phase: SessionPhase,
    healthy: bool,
}

impl AcquisitionSession {
    pub async fn open(
        factory: &dyn SessionFactory,
        index: usize,
        ctx: &SessionContext,
    ) -> Result<Self, SchedulerError> {
        let config: &OrchestratorConfig = &ctx.config;
        let staging = config.staging_dir(index);
        tokio::fs::create_dir_all(&staging).await?;
        let driver = factory
            .launch(index, &staging)
            .await
            .map_err(|source| SchedulerError::Launch {
                session: index,
                source,
            })?;
        ctx.metrics.session_opened();
        info!(target: "session", staging = %staging.display(), "session opened");
        Ok(Self {
            id: SessionId::numbered(index),
            index,
            driver,
            frames: FrameTracker::named(config.site.frame_name.clone(), config.site.landmark.clone()),
            staging,
            phase: SessionPhase::Initializing,
            healthy: true,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Navigated, idle and not lost.
    pub fn is_healthy(&self) -> bool {
        self.healthy && self.phase.accepts_work()
    }

    fn deps<'a>(&'a self, ctx: &'a SessionContext) -> RuntimeDeps<'a> {
        RuntimeDeps {
            driver: &*self.driver,
            pacer: &ctx.pacer,
            frames: &self.frames,
            diagnostics: &*ctx.diagnostics,
            element: ctx.config.element,
        }
    }

    pub async fn navigate(&mut self, ctx: &SessionContext) -> Result<NavigationReport, SchedulerError> {
        let flow = ctx.config.site.navigation();
        let outcome = NavigationSequencer::new(self.deps(ctx)).run(&flow).await;
        match outcome {
            Ok(report) => {
                self.phase = SessionPhase::Navigated;
                info!(target: "session", latency_ms = report.latency_ms, "query form reached");
                Ok(report)
            }
            Err(err) => {
                self.healthy = false;
                Err(SchedulerError::navigation(self.index, err))
            }
        }
    }

    /// Acquire one dataset on the already navigated page.
    pub async fn acquire(
        &mut self,
        ctx: &SessionContext,
        dataset: &DatasetConfig,
        pass: Pass,
    ) -> AcquireReport {
        self.phase = SessionPhase::Acquiring {
            dataset: dataset.name.clone(),
        };
        let report = {
            let controller = AcquisitionController::new(
                self.deps(ctx),
                &ctx.config.site,
                &ctx.config.acquire,
                self.staging.clone(),
                ctx.config.download_dir.clone(),
            );
            controller.acquire(dataset).await
        };
        ctx.metrics.observe_dataset(pass, &report);
        if report.session_lost {
            warn!(target: "session", dataset = %dataset.name, "session lost during acquisition");
            self.healthy = false;
            ctx.metrics.session_lost();
        }
        self.phase = SessionPhase::Idle;
        report
    }

    /// Navigate once, then acquire `batch` in order. Datasets that could not
    /// be attempted (navigation failed, session lost, run cancelled) are
    /// reported as failed.
    pub async fn run_batch(&mut self, ctx: &SessionContext, batch: &[DatasetConfig]) -> SessionResult {
        let mut result = SessionResult::new(self.id.clone());
        if let Err(err) = self.navigate(ctx).await {
            error!(target: "session", error = %err, "navigation failed; batch abandoned");
            ctx.metrics.session_lost();
            result.outcomes = batch.iter().map(|d| DatasetOutcome::failed(&d.name)).collect();
            result.healthy = false;
            return result;
        }

        for (position, dataset) in batch.iter().enumerate() {
            if !self.healthy || ctx.pacer.is_cancelled() {
                warn!(target: "session", dataset = %dataset.name, "skipped; session unusable");
                result.outcomes.push(DatasetOutcome::failed(&dataset.name));
                continue;
            }
            info!(
                target: "session",
                dataset = %dataset.name,
                position = position + 1,
                total = batch.len(),
                "acquiring dataset"
            );
            let report = self.acquire(ctx, dataset, Pass::First).await;
            if report.outcome.success {
                info!(target: "session", dataset = %dataset.name, "dataset succeeded");
            } else {
                warn!(target: "session", dataset = %dataset.name, error = ?report.last_error, "dataset failed");
            }
            result.outcomes.push(report.outcome);
            result.downloads.extend(report.download);
        }
        result.healthy = self.healthy;
        result
    }

    /// Release the browser. Idempotent.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        if let Err(err) = self.driver.close().await {
            warn!(target: "session", error = %err, "browser close failed");
        }
        // Only removed when empty: leftovers stay for inspection.
        if let Err(err) = tokio::fs::remove_dir(&self.staging).await {
            debug!(target: "session", dir = %self.staging.display(), error = %err, "staging directory kept");
        }
        self.phase = SessionPhase::Closed;
        info!(target: "session", session = %self.id, "session closed");
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        if self.phase != SessionPhase::Closed {
            warn!(target: "session", session = %self.id, phase = self.phase.label(), "session dropped without close");
        }
    }
}
