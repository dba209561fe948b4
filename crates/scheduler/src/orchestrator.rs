//! Sequential and parallel runs over the dataset catalog

use std::sync::Arc;

use action_locator::DiagnosticSink;
use action_primitives::Pacer;
use fundstat_core_types::{DatasetConfig, DatasetOutcome, RunTally, SessionId, SessionResult};
use tracing::{error, info, info_span, instrument, warn, Instrument};

use crate::{
    error::SchedulerError,
    metrics::RunMetrics,
    model::{partition, OrchestratorConfig, Pass, SessionContext},
    session::{AcquisitionSession, SessionFactory},
};

pub struct Orchestrator {
    factory: Arc<dyn SessionFactory>,
    ctx: SessionContext,
}

impl Orchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: OrchestratorConfig,
        pacer: Pacer,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, SchedulerError> {
        Ok(Self {
            factory,
            ctx: SessionContext {
                config: Arc::new(config),
                pacer,
                diagnostics,
                metrics: Arc::new(RunMetrics::new()?),
            },
        })
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.ctx.metrics
    }

    /// One session when `sessions <= 1`, otherwise parallel batches plus a
    /// retry pass.
    pub async fn run(&self, datasets: &[DatasetConfig], sessions: usize) -> RunTally {
        if sessions <= 1 {
            let result = self.run_sequential(datasets).await;
            RunTally {
                first_pass: result.outcomes,
                retry_pass: Vec::new(),
            }
        } else {
            self.run_parallel(datasets, sessions).await
        }
    }

    /// Navigate one session and acquire every dataset in order.
    #[instrument(skip_all, fields(datasets = datasets.len()))]
    pub async fn run_sequential(&self, datasets: &[DatasetConfig]) -> SessionResult {
        let span = info_span!("session", session = 1);
        async {
            let Some(mut session) = self.open(1).await else {
                return abandoned(SessionId::numbered(1), datasets);
            };
            let result = session.run_batch(&self.ctx, datasets).await;
            session.close().await;
            log_session_result(&result);
            result
        }
        .instrument(span)
        .await
    }

    /// Steps:
    /// 1. Partition into contiguous batches, one per session.
    /// 2. Start the sessions concurrently, each after `index * stagger`.
    /// 3. Keep the sessions that finished healthy; close the others.
    /// 4. Retry first-pass failures on the first healthy session, moving to
    ///    the next one if it is lost.
    /// 5. Close every kept session.
    #[instrument(skip_all, fields(datasets = datasets.len(), sessions = sessions))]
    pub async fn run_parallel(&self, datasets: &[DatasetConfig], sessions: usize) -> RunTally {
        let batches = partition(datasets, sessions);
        info!(target: "orchestrator", batches = batches.len(), "starting parallel sessions");

        let mut handles = Vec::with_capacity(batches.len());
        for (offset, batch) in batches.into_iter().enumerate() {
            let index = offset + 1;
            let factory = Arc::clone(&self.factory);
            let ctx = self.ctx.clone();
            let delay = ctx.config.stagger * offset as u32;
            let names: Vec<String> = batch.iter().map(|d| d.name.clone()).collect();
            let span = info_span!("session", session = index);
            let task = tokio::spawn(
                async move {
                    if ctx.pacer.pause(delay).await.is_err() {
                        return (abandoned(SessionId::numbered(index), &batch), None);
                    }
                    run_batch_task(factory, ctx, index, batch).await
                }
                .instrument(span),
            );
            handles.push((index, names, task));
        }

        let mut tally = RunTally::default();
        let mut survivors = Vec::new();
        for (index, names, task) in handles {
            match task.await {
                Ok((result, session)) => {
                    log_session_result(&result);
                    tally.first_pass.extend(result.outcomes);
                    survivors.extend(session);
                }
                Err(err) => {
                    error!(target: "orchestrator", session = index, error = %err, "session task aborted");
                    tally
                        .first_pass
                        .extend(names.iter().map(DatasetOutcome::failed));
                }
            }
        }

        let failed: Vec<&DatasetConfig> = {
            let names = tally.first_pass_failures();
            datasets.iter().filter(|d| names.contains(&d.name)).collect()
        };
        info!(
            target: "orchestrator",
            succeeded = tally.first_pass.len() - failed.len(),
            failed = failed.len(),
            "first pass complete"
        );
        if !failed.is_empty() {
            tally.retry_pass = self.retry_pass(&failed, &mut survivors).await;
        }

        for session in &mut survivors {
            session.close().await;
        }
        tally
    }

    async fn retry_pass(
        &self,
        failed: &[&DatasetConfig],
        survivors: &mut [AcquisitionSession],
    ) -> Vec<DatasetOutcome> {
        let mut outcomes = Vec::with_capacity(failed.len());
        for dataset in failed {
            if self.ctx.pacer.is_cancelled() {
                outcomes.push(DatasetOutcome::failed(&dataset.name));
                continue;
            }
            let Some(session) = survivors.iter_mut().find(|s| s.is_healthy()) else {
                warn!(target: "orchestrator", dataset = %dataset.name, "no healthy session left for retry");
                outcomes.push(DatasetOutcome::failed(&dataset.name));
                continue;
            };
            let span = info_span!("session", session = session.index(), pass = "retry");
            let report = async {
                info!(target: "orchestrator", dataset = %dataset.name, "retrying dataset");
                session.acquire(&self.ctx, dataset, Pass::Retry).await
            }
            .instrument(span)
            .await;
            if report.outcome.success {
                info!(target: "orchestrator", dataset = %dataset.name, "retry succeeded");
            } else {
                warn!(target: "orchestrator", dataset = %dataset.name, error = ?report.last_error, "retry failed");
            }
            outcomes.push(report.outcome);
        }
        outcomes
    }

    async fn open(&self, index: usize) -> Option<AcquisitionSession> {
        open_session(&*self.factory, &self.ctx, index).await
    }
}

/// Body of one parallel session task. The session is handed back only when
/// it stayed healthy; otherwise it is closed here.
async fn run_batch_task(
    factory: Arc<dyn SessionFactory>,
    ctx: SessionContext,
    index: usize,
    batch: Vec<DatasetConfig>,
) -> (SessionResult, Option<AcquisitionSession>) {
    let Some(mut session) = open_session(&*factory, &ctx, index).await else {
        return (abandoned(SessionId::numbered(index), &batch), None);
    };
    let result = session.run_batch(&ctx, &batch).await;
    if result.healthy && !ctx.pacer.is_cancelled() {
        (result, Some(session))
    } else {
        session.close().await;
        (result, None)
    }
}

async fn open_session(
    factory: &dyn SessionFactory,
    ctx: &SessionContext,
    index: usize,
) -> Option<AcquisitionSession> {
    match AcquisitionSession::open(factory, index, ctx).await {
        Ok(session) => Some(session),
        Err(err) => {
            error!(target: "orchestrator", session = index, error = %err, "session could not be opened");
            None
        }
    }
}

fn abandoned(session: SessionId, batch: &[DatasetConfig]) -> SessionResult {
    let mut result = SessionResult::new(session);
    result.outcomes = batch.iter().map(|d| DatasetOutcome::failed(&d.name)).collect();
    result.healthy = false;
    result
}

fn log_session_result(result: &SessionResult) {
    info!(
        target: "orchestrator",
        session = %result.session,
        succeeded = result.success_count(),
        total = result.outcomes.len(),
        healthy = result.healthy,
        "session batch finished"
    );
}
