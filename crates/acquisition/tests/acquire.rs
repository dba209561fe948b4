use std::{path::Path, time::Duration};

use action_flow::NavigationSequencer;
use action_locator::{ArtifactDiagnostics, DiagnosticSink, NoDiagnostics, ResolveOptions, RuntimeDeps};
use action_primitives::{FrameTracker, Pacer, RetryPolicy, SettleRange};
use cdp_adapter::fixture::FixtureDriver;
use fundstat_acquisition::{
    fixture::{ExportPlan, SiteFixture},
    AcquireSettings, AcquisitionController, DetectorSettings, NavPacing, SiteProfile,
};
use fundstat_core_types::{builtin_catalog, DatasetConfig};
use tempfile::TempDir;
use tool_select_option::DropdownTimings;

struct Harness {
    driver: FixtureDriver,
    pacer: Pacer,
    frames: FrameTracker,
    site: SiteProfile,
    settings: AcquireSettings,
    staging: TempDir,
    output: TempDir,
}

impl Harness {
    fn new(plan: ExportPlan) -> Self {
        let staging = TempDir::new().unwrap();
        let fixture = SiteFixture::new(staging.path(), plan);
        let site = SiteProfile::kofia("http://fixture.local/", NavPacing::default());
        let frames = FrameTracker::named(site.frame_name.clone(), site.landmark.clone());
        Self {
            driver: fixture.driver(),
            pacer: Pacer::immediate(),
            frames,
            site,
            settings: fast_settings(),
            staging,
            output: TempDir::new().unwrap(),
        }
    }

    fn deps<'a>(&'a self, diagnostics: &'a dyn DiagnosticSink) -> RuntimeDeps<'a> {
        RuntimeDeps {
            driver: &self.driver,
            pacer: &self.pacer,
            frames: &self.frames,
            diagnostics,
            element: ResolveOptions::new(Duration::from_millis(20), RetryPolicy::once()),
        }
    }

    async fn navigate(&self) {
        let report = NavigationSequencer::new(self.deps(&NoDiagnostics))
            .run(&self.site.navigation())
            .await
            .unwrap();
        assert!(report.is_ready());
    }

    fn controller<'a>(&'a self, diagnostics: &'a dyn DiagnosticSink) -> AcquisitionController<'a> {
        AcquisitionController::new(
            self.deps(diagnostics),
            &self.site,
            &self.settings,
            self.staging.path(),
            self.output.path(),
        )
    }

    fn output_file(&self, name: &str) -> std::path::PathBuf {
        self.output.path().join(name)
    }
}

fn fast_settings() -> AcquireSettings {
    AcquireSettings {
        retry: RetryPolicy::new(3, 0, 0),
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

fn dataset(name: &str) -> DatasetConfig {
    builtin_catalog()
        .into_iter()
        .find(|config| config.name == name)
        .unwrap()
}

fn leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_acquires_dataset_and_renames_export() {
    let plan = ExportPlan::new();
    let harness = Harness::new(plan.clone());
    harness.navigate().await;

    let report = harness.controller(&NoDiagnostics).acquire(&dataset("RawDataEquity")).await;

    assert!(report.outcome.success, "{:?}", report.last_error);
    assert_eq!(report.outcome.attempts, 1);
    assert!(!report.session_lost);
    let record = report.download.unwrap();
    assert_eq!(record.target, harness.output_file("Equity.xls"));
    assert_eq!(
        std::fs::read_to_string(&record.target).unwrap(),
        "주식형/전체\n"
    );
    assert!(leftovers(harness.staging.path()).is_empty());
    assert_eq!(plan.exports(), vec!["주식형/전체".to_string()]);

    let driver = &harness.driver;
    assert_eq!(driver.text("period_text").as_deref(), Some("5년"));
    assert_eq!(driver.text("category_text").as_deref(), Some("전체"));
    assert_eq!(driver.attr("scope_전체", "aria-checked").as_deref(), Some("true"));
    assert_eq!(driver.attr("periodicity_월간", "aria-checked").as_deref(), Some("true"));
}

#[tokio::test]
async fn test_domestic_region_skips_hidden_group() {
    let plan = ExportPlan::new();
    let harness = Harness::new(plan.clone());
    harness.navigate().await;

    let report = harness
        .controller(&NoDiagnostics)
        .acquire(&dataset("RawDataDomesticEquity"))
        .await;

    assert!(report.outcome.success);
    assert_eq!(plan.exports(), vec!["주식형/국내".to_string()]);
    assert_eq!(harness.driver.attr("region_국내", "aria-checked").as_deref(), Some("true"));
    assert_eq!(harness.driver.click_count("region_ghost_국내"), 0);
    assert!(harness.output_file("DomesticEquity.xls").exists());
}

#[tokio::test]
async fn test_lazily_rendered_fund_type_is_reached() {
    let harness = Harness::new(ExportPlan::new());
    harness.navigate().await;

    let report = harness
        .controller(&NoDiagnostics)
        .acquire(&dataset("RawDataMoneyMarket"))
        .await;

    assert!(report.outcome.success, "{:?}", report.last_error);
    assert_eq!(harness.driver.text("fund_type_text").as_deref(), Some("단기금융"));
    assert!(harness.output_file("MoneyMarket.xls").exists());
}

#[tokio::test]
async fn test_transient_download_failures_are_retried() {
    let plan = ExportPlan::new();
    plan.fail_exports("채권형", "전체", 2);
    let harness = Harness::new(plan.clone());
    harness.navigate().await;

    let report = harness.controller(&NoDiagnostics).acquire(&dataset("RawDataBond")).await;

    assert!(report.outcome.success, "{:?}", report.last_error);
    assert_eq!(report.outcome.attempts, 3);
    assert!(harness.output_file("Bond.xls").exists());
    assert_eq!(harness.driver.click_count("export_button"), 3);
}

#[tokio::test]
async fn test_exhausted_retries_end_in_failed_outcome() {
    let plan = ExportPlan::new();
    plan.fail_exports("채권형", "전체", 10);
    let harness = Harness::new(plan);
    harness.navigate().await;

    let report = harness.controller(&NoDiagnostics).acquire(&dataset("RawDataBond")).await;

    assert!(!report.outcome.success);
    assert_eq!(report.outcome.attempts, 3);
    assert!(report.download.is_none());
    assert!(!report.session_lost);
    assert!(report.last_error.unwrap().contains("no finished download"));
    assert!(!harness.output_file("Bond.xls").exists());
}

#[tokio::test]
async fn test_empty_results_still_export() {
    let plan = ExportPlan::new();
    plan.break_search();
    let harness = Harness::new(plan);
    harness.navigate().await;
    let artifacts = TempDir::new().unwrap();
    let diagnostics = ArtifactDiagnostics::new(artifacts.path());

    let report = harness.controller(&diagnostics).acquire(&dataset("RawDataEquity")).await;

    assert!(report.outcome.success);
    assert!(harness.output_file("Equity.xls").exists());
    assert!(leftovers(artifacts.path())
        .iter()
        .any(|name| name.starts_with("debug_search_no_data_RawDataEquity") && name.ends_with(".html")));
}

#[tokio::test]
async fn test_stale_output_is_replaced() {
    let harness = Harness::new(ExportPlan::new());
    std::fs::write(harness.output_file("Equity.xls"), "stale").unwrap();
    harness.navigate().await;

    let report = harness.controller(&NoDiagnostics).acquire(&dataset("RawDataEquity")).await;

    assert!(report.outcome.success);
    assert_eq!(
        std::fs::read_to_string(harness.output_file("Equity.xls")).unwrap(),
        "주식형/전체\n"
    );
}

#[tokio::test]
async fn test_second_dataset_reuses_form_state() {
    let plan = ExportPlan::new();
    let harness = Harness::new(plan.clone());
    harness.navigate().await;
    let controller = harness.controller(&NoDiagnostics);

    let first = controller.acquire(&dataset("RawDataEquity")).await;
    let second = controller.acquire(&dataset("RawDataBond")).await;

    assert!(first.outcome.success && second.outcome.success);
    assert_eq!(
        plan.exports(),
        vec!["주식형/전체".to_string(), "채권형/전체".to_string()]
    );
    // Period already showed 5년 on the second pass: no option click.
    assert_eq!(harness.driver.click_count("period_list_2"), 1);
}
