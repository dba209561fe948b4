use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use action_flow::{NavState, NavStep, NavigationError, NavigationFlow, NavigationSequencer};
use action_locator::{LocatorSet, NoDiagnostics, ResolveOptions, RuntimeDeps};
use action_primitives::{FrameTracker, Pacer, RetryPolicy, SettleRange};
use cdp_adapter::{
    fixture::{ElementSpec, FixtureDriver},
    Locator,
};
use tool_click::ClickOpt;

const ENTRY: &str = "http://freesis.kofia.or.kr/";
const FUND_TAB: &str = "//img[@alt='펀드']";
const INDUSTRY: &str = "//div[@data-itemid='MSIS40100000000000']";
const STATS_ICON: &str =
    "//div[contains(@class, 'cl-tree-item')][@title='운용통계']//div[contains(@class, 'cl-tree-treeicon')]";
const ASSET_WEIGHT: &str = "//div[@title='투자자산별비중']";
const TREND_TAB: &str = "//div[@role='tab' and text()='추이']";

struct Harness {
    driver: FixtureDriver,
    pacer: Pacer,
    frames: FrameTracker,
}

impl Harness {
    fn new(driver: FixtureDriver) -> Self {
        Self {
            driver,
            pacer: Pacer::immediate(),
            frames: FrameTracker::named("main", Locator::xpath(FUND_TAB)),
        }
    }

    fn sequencer(&self) -> NavigationSequencer<'_> {
        NavigationSequencer::new(RuntimeDeps {
            driver: &self.driver,
            pacer: &self.pacer,
            frames: &self.frames,
            diagnostics: &NoDiagnostics,
            element: ResolveOptions::new(Duration::from_millis(20), RetryPolicy::once()),
        })
        .with_click_opt(ClickOpt {
            scroll_settle: SettleRange::fixed(0),
            ..ClickOpt::default()
        })
    }
}

fn flow() -> NavigationFlow {
    let settle = SettleRange::new(4_000, 6_000);
    NavigationFlow::new(ENTRY)
        .step(NavStep::new(
            NavState::FundTabClicked,
            LocatorSet::xpaths("fund_tab", &[FUND_TAB]),
            settle,
        ))
        .step(NavStep::new(
            NavState::IndustryMenuClicked,
            LocatorSet::xpaths("fund_industry", &[INDUSTRY]),
            settle,
        ))
        .step(
            NavStep::new(
                NavState::StatsMenuExpanded,
                LocatorSet::xpaths("stats_expand", &[STATS_ICON]),
                settle,
            )
            .expect(LocatorSet::xpaths("asset_weight", &[ASSET_WEIGHT]), 3, 10),
        )
        .step(NavStep::new(
            NavState::AssetWeightClicked,
            LocatorSet::xpaths("asset_weight", &[ASSET_WEIGHT]),
            settle,
        ))
        .step(NavStep::new(
            NavState::TrendTabClicked,
            LocatorSet::xpaths("trend_tab", &[TREND_TAB]),
            settle,
        ))
}

/// Portal whose content frame appears on navigation and whose stats submenu
/// opens on the `expand_on`-th icon click.
fn portal(expand_on: u32) -> FixtureDriver {
    let driver = FixtureDriver::new();
    driver.on_navigate(|state, _| state.add_frame("main"));
    for (key, expr) in [
        ("fund_tab", FUND_TAB),
        ("industry", INDUSTRY),
        ("stats_icon", STATS_ICON),
        ("trend_tab", TREND_TAB),
    ] {
        driver.add(ElementSpec::new(key).frame("main").locator(expr));
    }
    driver.add(
        ElementSpec::new("asset_weight")
            .frame("main")
            .locator(ASSET_WEIGHT)
            .hidden(),
    );
    let clicks = Arc::new(AtomicU32::new(0));
    driver.on_click("stats_icon", move |state, _| {
        if clicks.fetch_add(1, Ordering::SeqCst) + 1 >= expand_on {
            state.set_visible("asset_weight", true);
        }
    });
    driver
}

#[tokio::test]
async fn test_reaches_query_form() {
    let harness = Harness::new(portal(2));
    let report = harness.sequencer().run(&flow()).await.unwrap();

    assert!(report.is_ready());
    assert_eq!(report.steps.len(), 5);
    let stats = &report.steps[2];
    assert_eq!(stats.state, NavState::StatsMenuExpanded);
    assert_eq!(stats.attempts, 2);
    assert_eq!(harness.driver.click_count("trend_tab"), 1);
    assert_eq!(harness.driver.calls()[0], format!("navigate {ENTRY}"));
}

#[tokio::test]
async fn test_submenu_that_never_opens_is_terminal() {
    let harness = Harness::new(portal(u32::MAX));
    let err = harness.sequencer().run(&flow()).await.unwrap_err();

    assert!(matches!(
        err,
        NavigationError::StepFailed { step: NavState::StatsMenuExpanded, .. }
    ));
    assert_eq!(harness.driver.click_count("stats_icon"), 3);
    assert_eq!(harness.driver.click_count("asset_weight"), 0);
}

#[tokio::test]
async fn test_missing_frame_fails_frame_step() {
    let driver = portal(1);
    driver.on_navigate(|_, _| {});
    let harness = Harness::new(driver);

    let err = harness.sequencer().run(&flow()).await.unwrap_err();
    assert!(matches!(
        err,
        NavigationError::StepFailed { step: NavState::MainFrameEntered, .. }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_missing_target_stops_later_steps() {
    let driver = portal(1);
    driver.with_state(|state| state.detach("industry"));
    let harness = Harness::new(driver);

    let err = harness.sequencer().run(&flow()).await.unwrap_err();
    assert!(matches!(
        err,
        NavigationError::StepFailed { step: NavState::IndustryMenuClicked, .. }
    ));
    assert_eq!(harness.driver.click_count("fund_tab"), 1);
    assert_eq!(harness.driver.click_count("stats_icon"), 0);
}

#[test]
fn test_cancelled_before_start() {
    let harness = Harness::new(portal(1));
    harness.pacer.cancel_token().cancel();
    let err = tokio_test::block_on(harness.sequencer().run(&flow())).unwrap_err();
    assert!(matches!(err, NavigationError::Cancelled));
    assert!(harness.driver.calls().is_empty());
}
