use prometheus::{
    histogram_opts, opts, Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder,
};
use tracing::warn;

use fundstat_acquisition::AcquireReport;

use crate::model::Pass;

/// Process-local counters for one run. Registered on a private registry so
/// concurrent runs (and tests) never collide.
pub struct RunMetrics {
    registry: Registry,
    datasets: IntCounterVec,
    attempts: IntCounter,
    latency: Histogram,
    sessions: IntCounterVec,
}

/// Point-in-time copy of the run counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub retried_ok: u64,
    pub attempts: u64,
    pub sessions_opened: u64,
    pub sessions_lost: u64,
}

impl RunMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let datasets = IntCounterVec::new(
            opts!("fundstat_datasets_total", "Dataset acquisitions by pass and result"),
            &["pass", "result"],
        )?;
        let attempts = IntCounter::new(
            "fundstat_acquire_attempts_total",
            "Acquisition attempts across all datasets",
        )?;
        let latency = Histogram::with_opts(
            histogram_opts!(
                "fundstat_dataset_latency_seconds",
                "Wall time spent per dataset",
                vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]
            ),
        )?;
        let sessions = IntCounterVec::new(
            opts!("fundstat_sessions_total", "Session lifecycle events"),
            &["event"],
        )?;
        registry.register(Box::new(datasets.clone()))?;
        registry.register(Box::new(attempts.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(sessions.clone()))?;
        Ok(Self {
            registry,
            datasets,
            attempts,
            latency,
            sessions,
        })
    }

    pub fn observe_dataset(&self, pass: Pass, report: &AcquireReport) {
        let result = if report.outcome.success { "success" } else { "failure" };
        self.datasets.with_label_values(&[pass.label(), result]).inc();
        self.attempts.inc_by(u64::from(report.outcome.attempts));
        self.latency.observe(report.latency_ms as f64 / 1_000.0);
    }

    pub fn session_opened(&self) {
        self.sessions.with_label_values(&["opened"]).inc();
    }

    pub fn session_lost(&self) {
        self.sessions.with_label_values(&["lost"]).inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let count = |pass: Pass, result: &str| self.datasets.with_label_values(&[pass.label(), result]).get();
        MetricsSnapshot {
            succeeded: count(Pass::First, "success") + count(Pass::Retry, "success"),
            failed: count(Pass::First, "failure") + count(Pass::Retry, "failure"),
            retried_ok: count(Pass::Retry, "success"),
            attempts: self.attempts.get(),
            sessions_opened: self.sessions.with_label_values(&["opened"]).get(),
            sessions_lost: self.sessions.with_label_values(&["lost"]).get(),
        }
    }

    /// Prometheus text exposition of the run registry.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            warn!(target: "metrics", error = %err, "metrics encoding failed");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundstat_core_types::DatasetOutcome;

    fn report(success: bool, attempts: u32) -> AcquireReport {
        AcquireReport {
            outcome: DatasetOutcome::new("RawDataBond", success, attempts),
            download: None,
            session_lost: false,
            last_error: None,
            latency_ms: 1_200,
        }
    }

    #[test]
    fn test_snapshot_counts_passes() {
        let metrics = RunMetrics::new().unwrap();
        metrics.observe_dataset(Pass::First, &report(false, 3));
        metrics.observe_dataset(Pass::Retry, &report(true, 1));
        metrics.session_opened();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.retried_ok, 1);
        assert_eq!(snapshot.attempts, 4);
        assert_eq!(snapshot.sessions_opened, 1);
    }

    #[test]
    fn test_render_exposes_counters() {
        let metrics = RunMetrics::new().unwrap();
        metrics.observe_dataset(Pass::First, &report(true, 1));
        let text = metrics.render();
        assert!(text.contains("fundstat_datasets_total{pass=\"first\",result=\"success\"} 1"));
    }
}
