use std::{
    path::Path,
    sync::Arc,
    time::Duration,
};

use action_locator::{NoDiagnostics, ResolveOptions};
use action_primitives::{Pacer, RetryPolicy, SettleRange};
use async_trait::async_trait;
use cdp_adapter::{fixture::FixtureDriver, Driver, DriverError};
use fundstat_acquisition::{
    fixture::{ExportPlan, SiteFixture},
    AcquireSettings, DetectorSettings, SiteProfile,
};
use fundstat_core_types::{builtin_catalog, DatasetConfig};
use fundstat_scheduler::{Orchestrator, OrchestratorConfig, SessionFactory};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tool_select_option::DropdownTimings;

/// Opens replica pages that share one export plan; selected sessions never
/// get their content frame.
struct FixtureFactory {
    plan: ExportPlan,
    without_frame: Vec<usize>,
    drivers: Mutex<Vec<(usize, FixtureDriver)>>,
}

impl FixtureFactory {
    fn new(plan: ExportPlan) -> Self {
        Self {
            plan,
            without_frame: Vec::new(),
            drivers: Mutex::new(Vec::new()),
        }
    }

    fn without_frame(mut self, sessions: &[usize]) -> Self {
        self.without_frame = sessions.to_vec();
        self
    }

    fn launched(&self) -> usize {
        self.drivers.lock().len()
    }

    fn all_closed(&self) -> bool {
        self.drivers.lock().iter().all(|(_, driver)| driver.is_closed())
    }
}

#[async_trait]
impl SessionFactory for FixtureFactory {
    async fn launch(&self, index: usize, staging: &Path) -> Result<Arc<dyn Driver>, DriverError> {
        let fixture = SiteFixture::new(staging, self.plan.clone());
        let driver = fixture.driver();
        if self.without_frame.contains(&index) {
            driver.on_navigate(|_, _| {});
        }
        self.drivers.lock().push((index, driver.clone()));
        Ok(Arc::new(driver))
    }
}

fn settings(attempts: u32) -> AcquireSettings {
    AcquireSettings {
        retry: RetryPolicy::new(attempts, 0, 0),
        results_ms: 100,
        form_ready_ms: 200,
        download_ms: 300,
        before_search: SettleRange::fixed(0),
        before_export: SettleRange::fixed(0),
        after_download: SettleRange::fixed(0),
        dropdown: DropdownTimings {
            open_wait_ms: 50,
            listbox_wait_ms: 30,
            click_settle: SettleRange::fixed(0),
            wheel_delta: 150.0,
            max_wheel_steps: 10,
            wheel_pause_ms: 0,
        },
        detector: DetectorSettings {
            poll_interval_ms: 10,
            sample_spacing_ms: 5,
            ..DetectorSettings::default()
        },
    }
}

fn orchestrator(factory: Arc<FixtureFactory>, dir: &Path, attempts: u32, pacer: Pacer) -> Orchestrator {
    let config = OrchestratorConfig::new(SiteProfile::default(), settings(attempts), dir)
        .with_element(ResolveOptions::new(Duration::from_millis(20), RetryPolicy::once()))
        .with_stagger(Duration::from_millis(5));
    Orchestrator::new(factory, config, pacer, Arc::new(NoDiagnostics)).unwrap()
}

fn dataset(name: &str) -> DatasetConfig {
    builtin_catalog()
        .into_iter()
        .find(|config| config.name == name)
        .unwrap()
}

fn renamed(name: &str, source: &str) -> DatasetConfig {
    DatasetConfig {
        name: name.to_string(),
        ..dataset(source)
    }
}

fn six_datasets() -> Vec<DatasetConfig> {
    [
        "RawDataEquity",
        "RawDataDomesticEquity",
        "RawDataBond",
        "RawDataDomesticBond",
        "RawDataMoneyMarket",
        "RawDataHybridAsset",
    ]
    .iter()
    .map(|name| dataset(name))
    .collect()
}

#[tokio::test]
async fn test_sequential_run_downloads_every_dataset() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(FixtureFactory::new(ExportPlan::new()));
    let orchestrator = orchestrator(factory.clone(), dir.path(), 3, Pacer::immediate());
    let datasets = vec![renamed("Equity", "RawDataEquity"), renamed("Bond", "RawDataBond")];

    let result = orchestrator.run_sequential(&datasets).await;

    assert_eq!(
        result.pairs(),
        vec![("Equity".to_string(), true), ("Bond".to_string(), true)]
    );
    assert!(result.healthy);
    assert_eq!(result.downloads.len(), 2);
    assert!(dir.path().join("Equity.xls").exists());
    assert!(dir.path().join("Bond.xls").exists());
    assert!(!dir.path().join(".session-1").exists());
    assert_eq!(factory.launched(), 1);
    assert!(factory.all_closed());
}

#[tokio::test]
async fn test_parallel_retry_pass_recovers_transient_failure() {
    let dir = TempDir::new().unwrap();
    let plan = ExportPlan::new();
    plan.fail_exports("채권형", "전체", 2);
    let factory = Arc::new(FixtureFactory::new(plan));
    let orchestrator = orchestrator(factory.clone(), dir.path(), 2, Pacer::immediate());
    let datasets = six_datasets();

    let tally = orchestrator.run_parallel(&datasets, 3).await;

    assert_eq!(tally.first_pass.len(), 6);
    assert_eq!(tally.first_pass_failures(), vec!["RawDataBond".to_string()]);
    assert_eq!(tally.retry_pass.len(), 1);
    assert!(tally.retry_pass[0].success);
    assert!(tally.finally_failed().is_empty());
    for config in &datasets {
        assert!(dir.path().join(config.file_name()).exists(), "{}", config.output_name);
    }
    assert_eq!(factory.launched(), 3);
    assert!(factory.all_closed());

    let metrics = orchestrator.metrics().snapshot();
    assert_eq!(metrics.retried_ok, 1);
    assert_eq!(metrics.sessions_opened, 3);
}

#[tokio::test]
async fn test_batch_of_unnavigable_session_is_retried_elsewhere() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(FixtureFactory::new(ExportPlan::new()).without_frame(&[3]));
    let orchestrator = orchestrator(factory.clone(), dir.path(), 1, Pacer::immediate());

    let tally = orchestrator.run(&six_datasets(), 3).await;

    assert_eq!(
        tally.first_pass_failures(),
        vec!["RawDataMoneyMarket".to_string(), "RawDataHybridAsset".to_string()]
    );
    assert!(tally.retry_pass.iter().all(|outcome| outcome.success));
    assert!(tally.finally_failed().is_empty());
    assert!(factory.all_closed());
    assert_eq!(orchestrator.metrics().snapshot().sessions_lost, 1);
}

#[tokio::test]
async fn test_without_healthy_session_failures_are_final() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(FixtureFactory::new(ExportPlan::new()).without_frame(&[1, 2]));
    let orchestrator = orchestrator(factory.clone(), dir.path(), 1, Pacer::immediate());
    let datasets = vec![dataset("RawDataEquity"), dataset("RawDataBond")];

    let tally = orchestrator.run(&datasets, 2).await;

    assert_eq!(tally.retry_pass.len(), 2);
    assert_eq!(
        tally.finally_failed(),
        vec!["RawDataBond".to_string(), "RawDataEquity".to_string()]
    );
    assert!(factory.all_closed());
}

#[tokio::test]
async fn test_cancelled_run_still_closes_browser() {
    let dir = TempDir::new().unwrap();
    let factory = Arc::new(FixtureFactory::new(ExportPlan::new()));
    let token = CancellationToken::new();
    token.cancel();
    let orchestrator = orchestrator(factory.clone(), dir.path(), 3, Pacer::new(0.0, token));
    let datasets = vec![dataset("RawDataEquity"), dataset("RawDataBond")];

    let tally = orchestrator.run(&datasets, 1).await;

    assert_eq!(tally.finally_failed().len(), 2);
    assert_eq!(factory.launched(), 1);
    assert!(factory.all_closed());
    assert!(!dir.path().join("Equity.xls").exists());
}
