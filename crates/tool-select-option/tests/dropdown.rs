use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use action_locator::{LocatorSet, NoDiagnostics, ResolveOptions, RuntimeDeps};
use action_primitives::{FrameTracker, Pacer, RetryPolicy, SettleRange};
use cdp_adapter::{
    fixture::{ElementSpec, FixtureDriver, FixtureState},
    FrameTarget, Locator,
};
use tool_select_option::{
    option_exact_xpaths, DropdownDriver, DropdownError, DropdownTimings, SelectOutcome,
    VocabularyProbe, CURRENT_TEXT_XPATH, LISTBOX_XPATH, OPTION_TEXT_XPATH,
};

const LANDMARK: &str = "//img[@alt='펀드']";
const FUND_TYPE: &str = "//div[@title='펀드유형']//div[@role='combobox']";

fn timings() -> DropdownTimings {
    DropdownTimings {
        open_wait_ms: 50,
        listbox_wait_ms: 30,
        click_settle: SettleRange::fixed(0),
        wheel_delta: 150.0,
        max_wheel_steps: 10,
        wheel_pause_ms: 0,
    }
}

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
            frames: FrameTracker::named("main", Locator::xpath(LANDMARK)),
        }
    }

    fn deps(&self) -> RuntimeDeps<'_> {
        RuntimeDeps {
            driver: &self.driver,
            pacer: &self.pacer,
            frames: &self.frames,
            diagnostics: &NoDiagnostics,
            element: ResolveOptions::new(Duration::from_millis(20), RetryPolicy::once()),
        }
    }

    fn dropdown(&self) -> DropdownDriver<'_> {
        DropdownDriver::new(self.deps()).with_timings(timings())
    }
}

fn toggle(state: &mut FixtureState, control: &str, list: &str) {
    if state.attr(control, "aria-expanded").as_deref() == Some("true") {
        state.set_attr(control, "aria-expanded", "false");
        state.detach(list);
    } else {
        state.set_attr(control, "aria-expanded", "true");
        state.attach(list);
    }
}

/// Fund-type control in frame `main` whose option list is appended to the
/// document root and only renders "주식형" after `reveal_after` wheel steps.
fn fund_type_page(reveal_after: u32) -> FixtureDriver {
    let driver = FixtureDriver::new();
    driver.add_frame("main");
    driver
        .add(ElementSpec::new("landmark").frame("main").locator(LANDMARK))
        .add(
            ElementSpec::new("fund_type")
                .frame("main")
                .locator(FUND_TYPE)
                .attr("aria-expanded", "false"),
        )
        .add(
            ElementSpec::new("fund_type_text")
                .frame("main")
                .parent("fund_type")
                .locator(CURRENT_TEXT_XPATH)
                .text("전체"),
        )
        .add(ElementSpec::new("list").locator(LISTBOX_XPATH).detached())
        .add(
            ElementSpec::new("opt_mixed")
                .parent("list")
                .locator(".//div[contains(text(), '주식형')]")
                .text("혼합주식형"),
        )
        .add(
            ElementSpec::new("opt_equity")
                .parent("list")
                .locator(option_exact_xpaths("주식형")[1].clone())
                .text("주식형")
                .detached(),
        );

    driver.on_click("fund_type", |state, _| toggle(state, "fund_type", "list"));
    let wheels = Arc::new(AtomicU32::new(0));
    driver.on_wheel("list", move |state, _| {
        if wheels.fetch_add(1, Ordering::SeqCst) + 1 >= reveal_after {
            state.attach("opt_equity");
        }
    });
    driver.on_click("opt_equity", |state, _| {
        state.set_text("fund_type_text", "주식형");
        toggle(state, "fund_type", "list");
    });
    driver
}

fn fund_type_set() -> LocatorSet {
    LocatorSet::xpaths("fund_type", &[FUND_TYPE])
}

#[tokio::test]
async fn test_scrolls_virtualized_list_and_returns_to_frame() {
    let harness = Harness::new(fund_type_page(3));
    let outcome = harness
        .dropdown()
        .select(&fund_type_set(), "주식형")
        .await
        .unwrap();

    assert_eq!(outcome, SelectOutcome::Selected { attempt: 1, scrolls: 3 });
    assert_eq!(harness.driver.text("fund_type_text").as_deref(), Some("주식형"));
    assert_eq!(harness.driver.click_count("opt_mixed"), 0);
    assert_eq!(
        harness.driver.with_state(|s| s.current_frame().clone()),
        FrameTarget::named("main")
    );
}

#[tokio::test]
async fn test_second_select_is_a_no_op() {
    let harness = Harness::new(fund_type_page(1));
    let dropdown = harness.dropdown();
    dropdown.select(&fund_type_set(), "주식형").await.unwrap();
    let toggles = harness.driver.click_count("fund_type");

    let again = dropdown.select(&fund_type_set(), "주식형").await.unwrap();
    assert_eq!(again, SelectOutcome::AlreadySet);
    assert!(!again.opened());
    assert_eq!(harness.driver.click_count("fund_type"), toggles);
}

#[tokio::test]
async fn test_missing_option_closes_the_list() {
    let harness = Harness::new(fund_type_page(u32::MAX));
    let err = harness
        .dropdown()
        .with_retry(RetryPolicy::once())
        .select(&fund_type_set(), "채권형")
        .await
        .unwrap_err();

    assert!(matches!(err, DropdownError::OptionNotFound { ref option, .. } if option == "채권형"));
    assert_eq!(harness.driver.attr("fund_type", "aria-expanded").as_deref(), Some("false"));
    assert_eq!(harness.driver.text("fund_type_text").as_deref(), Some("전체"));
}

#[tokio::test]
async fn test_unregistered_option_click_is_retried() {
    let driver = fund_type_page(1);
    driver.fail_clicks("opt_equity", 2);
    let harness = Harness::new(driver);

    let outcome = harness
        .dropdown()
        .select(&fund_type_set(), "주식형")
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Selected { attempt: 2, scrolls: 0 });
}

#[tokio::test]
async fn test_identify_picks_control_by_option_labels() {
    let driver = FixtureDriver::new();
    driver.add_frame("main");
    driver.add(ElementSpec::new("landmark").frame("main").locator(LANDMARK));
    for (control, list, labels) in [
        ("category", "category_list", ["전체", "공모", "사모"]),
        ("fund_type", "fund_type_list", ["전체", "주식형", "채권형"]),
    ] {
        driver
            .add(
                ElementSpec::new(control)
                    .frame("main")
                    .locator("//div[@role='combobox']")
                    .attr("aria-expanded", "false"),
            )
            .add(
                ElementSpec::new(list)
                    .frame("main")
                    .locator(LISTBOX_XPATH)
                    .detached(),
            );
        for (i, label) in labels.iter().enumerate() {
            driver.add(
                ElementSpec::new(format!("{list}_{i}"))
                    .frame("main")
                    .parent(list)
                    .locator(OPTION_TEXT_XPATH)
                    .text(*label),
            );
        }
        driver.on_click(control, move |state, _| toggle(state, control, list));
    }
    let harness = Harness::new(driver);

    let probe = VocabularyProbe::new(
        "//div[@role='combobox']",
        &["주식형", "혼합주식형", "혼합채권형", "채권형", "단기금융", "전체"],
        2,
    );
    let fallback = LocatorSet::xpaths("fallback", &["//div[@title='펀드유형']"]);
    let set = harness
        .dropdown()
        .identify(&probe, &fallback, "fund_type")
        .await
        .unwrap();

    assert_eq!(set.name(), "fund_type");
    assert_eq!(set.locators()[0].expr, "(//div[@role='combobox'])[2]");
    assert_eq!(set.locators()[1].expr, "//div[@title='펀드유형']");
    assert_eq!(harness.driver.attr("category", "aria-expanded").as_deref(), Some("false"));
    assert_eq!(harness.driver.attr("fund_type", "aria-expanded").as_deref(), Some("false"));
}
