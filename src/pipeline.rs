//! Acquisition followed by the transform stage.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use action_locator::ArtifactDiagnostics;
use action_primitives::Pacer;
use anyhow::{bail, Context, Result};
use fundstat_core_types::RunTally;
use fundstat_scheduler::{MetricsSnapshot, Orchestrator, SessionFactory};
use fundstat_transform::{RunContext, TransformReport};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

use crate::config::AppConfig;

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides `sessions.count` when set.
    pub sessions: Option<usize>,
    /// Date the package 2025-03-31 and drop later months.
    pub fixed_date: bool,
    pub skip_transform: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub tally: RunTally,
    pub metrics: MetricsSnapshot,
    pub transform: Option<TransformReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// A run fails when datasets are missing and no package was written.
    pub fn is_success(&self) -> bool {
        self.tally.finally_failed().is_empty() || self.transform.is_some()
    }
}

pub fn run_context(fixed_date: bool) -> RunContext {
    if fixed_date {
        RunContext::fixed()
    } else {
        RunContext::today()
    }
}

/// Transform whatever exports are in the download directory.
pub fn run_transform(config: &AppConfig, fixed_date: bool) -> Result<TransformReport> {
    let mut ctx = run_context(fixed_date);
    fundstat_transform::run(
        &config.paths.download_dir,
        &config.paths.output_dir,
        &config.catalog(),
        &mut ctx,
    )
    .with_context(|| {
        format!(
            "transforming exports in {}",
            config.paths.download_dir.display()
        )
    })
}

/// Acquire the catalog, then build the package unless skipped or cancelled.
pub async fn run(
    config: Arc<AppConfig>,
    factory: Arc<dyn SessionFactory>,
    options: RunOptions,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let started = Instant::now();
    let sessions = options.sessions.unwrap_or(config.sessions.count).max(1);
    let catalog = config.catalog();
    tokio::fs::create_dir_all(&config.paths.download_dir)
        .await
        .with_context(|| format!("creating {}", config.paths.download_dir.display()))?;

    let orchestrator = Orchestrator::new(
        factory,
        config.orchestrator_config(),
        Pacer::new(config.pacing.scale, cancel.clone()),
        Arc::new(ArtifactDiagnostics::new(config.paths.artifact_dir.clone())),
    )
    .context("building orchestrator")?;

    info!(datasets = catalog.len(), sessions, "acquisition started");
    let tally = orchestrator.run(&catalog, sessions).await;
    let metrics = orchestrator.metrics().snapshot();
    log_tally(&tally, &metrics);

    if cancel.is_cancelled() {
        bail!(
            "run cancelled after {} of {} datasets",
            tally.succeeded().len(),
            tally.total()
        );
    }

    let transform = if options.skip_transform {
        info!("transform skipped");
        None
    } else {
        let shared = Arc::clone(&config);
        let fixed_date = options.fixed_date;
        let report = tokio::task::spawn_blocking(move || {
            let _span = info_span!("transform").entered();
            run_transform(&shared, fixed_date)
        })
        .await
        .context("transform task failed")?;
        match report {
            Ok(report) => Some(report),
            Err(err) if !tally.finally_failed().is_empty() => {
                return Err(err.context(format!(
                    "{} datasets failed and no package could be built",
                    tally.finally_failed().len()
                )));
            }
            Err(err) => return Err(err),
        }
    };

    Ok(RunSummary {
        tally,
        metrics,
        transform,
        elapsed: started.elapsed(),
    })
}

fn log_tally(tally: &RunTally, metrics: &MetricsSnapshot) {
    let failed = tally.finally_failed();
    info!(
        target: "metrics",
        succeeded = metrics.succeeded,
        failed = metrics.failed,
        retried_ok = metrics.retried_ok,
        attempts = metrics.attempts,
        sessions_opened = metrics.sessions_opened,
        sessions_lost = metrics.sessions_lost,
        "acquisition metrics"
    );
    if failed.is_empty() {
        info!(total = tally.total(), "all datasets acquired");
    } else {
        warn!(failed = ?failed, "datasets still missing after the run");
    }
}
