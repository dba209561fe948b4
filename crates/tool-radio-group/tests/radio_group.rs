use std::time::Duration;

use action_locator::{NoDiagnostics, ResolveOptions, RuntimeDeps};
use action_primitives::{FrameTracker, Pacer, RetryPolicy, SettleRange};
use cdp_adapter::{
    fixture::{ElementSpec, FixtureDriver, FixtureState},
    ClickMethod, Locator,
};
use tool_radio_group::{
    radio_by_label, RadioDriver, RadioError, RadioGroup, RadioOutcome, VerifyPolicy, GROUP_XPATH,
    INNER_INPUT_XPATH, MEMBER_XPATH,
};

const LANDMARK: &str = "//img[@alt='펀드']";

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

    fn radios(&self) -> RadioDriver<'_> {
        RadioDriver::new(RuntimeDeps {
            driver: &self.driver,
            pacer: &self.pacer,
            frames: &self.frames,
            diagnostics: &NoDiagnostics,
            element: ResolveOptions::new(Duration::from_millis(20), RetryPolicy::once()),
        })
    }
}

fn region() -> RadioGroup {
    RadioGroup::new("region", &["전체", "국내", "해외", "해외30", "해외60"], 2)
        .with_click_settle(SettleRange::fixed(0))
}

/// Adds a radio group whose members check themselves on a synthetic click.
fn add_group(driver: &FixtureDriver, group: &'static str, labels: &[&'static str], hidden: bool) {
    driver.add(
        ElementSpec::new(group)
            .frame("main")
            .locator(GROUP_XPATH)
            .attr("role", "radiogroup"),
    );
    let keys: Vec<String> = labels.iter().map(|label| format!("{group}_{label}")).collect();
    for (label, key) in labels.iter().zip(&keys) {
        let mut spec = ElementSpec::new(key.clone())
            .frame("main")
            .parent(group)
            .locator(radio_by_label(label).expr)
            .locator(MEMBER_XPATH)
            .attr("aria-label", *label)
            .attr("aria-checked", "false");
        if hidden {
            spec = spec.hidden();
        }
        driver.add(spec);
        let me = key.clone();
        let all = keys.clone();
        driver.on_click(key.clone(), move |state, method| {
            if method == ClickMethod::Synthetic {
                check(state, &me, &all);
            }
        });
    }
}

fn check(state: &mut FixtureState, key: &str, group: &[String]) {
    for member in group {
        state.set_attr(member, "aria-checked", if member == key { "true" } else { "false" });
    }
}

fn page() -> FixtureDriver {
    let driver = FixtureDriver::new();
    driver.add_frame("main");
    driver.add(ElementSpec::new("landmark").frame("main").locator(LANDMARK));
    driver
}

#[tokio::test]
async fn test_shared_label_resolves_to_matching_group() {
    let driver = page();
    add_group(&driver, "scope", &["전체", "공모", "사모"], false);
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    let harness = Harness::new(driver);

    let outcome = harness.radios().select(&region(), "전체").await.unwrap();

    assert_eq!(outcome, RadioOutcome::Checked { strategy: "radio" });
    assert_eq!(harness.driver.attr("area_전체", "aria-checked").as_deref(), Some("true"));
    assert_eq!(harness.driver.attr("scope_전체", "aria-checked").as_deref(), Some("false"));
    assert_eq!(harness.driver.click_count("scope_전체"), 0);
}

#[tokio::test]
async fn test_hidden_duplicate_group_is_ignored() {
    let driver = page();
    add_group(&driver, "ghost", &["전체", "국내", "해외"], true);
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    let harness = Harness::new(driver);

    harness.radios().select(&region(), "국내").await.unwrap();

    assert_eq!(harness.driver.attr("area_국내", "aria-checked").as_deref(), Some("true"));
    assert_eq!(harness.driver.attr("ghost_국내", "aria-checked").as_deref(), Some("false"));
}

#[tokio::test]
async fn test_inner_input_is_clicked_first() {
    let driver = page();
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    driver.add(
        ElementSpec::new("area_국내_input")
            .frame("main")
            .parent("area_국내")
            .locator(INNER_INPUT_XPATH),
    );
    driver.on_click("area_국내_input", |state, _| {
        let group: Vec<String> = ["전체", "국내", "해외"].iter().map(|l| format!("area_{l}")).collect();
        check(state, "area_국내", &group);
    });
    let harness = Harness::new(driver);

    let outcome = harness.radios().select(&region(), "국내").await.unwrap();
    assert_eq!(outcome, RadioOutcome::Checked { strategy: "input" });
    assert_eq!(harness.driver.click_count("area_국내"), 0);
}

#[tokio::test]
async fn test_checked_radio_is_left_alone() {
    let driver = page();
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    driver.with_state(|state| state.set_attr("area_전체", "aria-checked", "true"));
    let harness = Harness::new(driver);

    let outcome = harness.radios().select(&region(), "전체").await.unwrap();
    assert_eq!(outcome, RadioOutcome::AlreadyChecked);
    assert_eq!(harness.driver.click_count("area_전체"), 0);
}

#[tokio::test]
async fn test_unverified_selection_follows_policy() {
    let driver = page();
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    driver.reject_method("area_해외", ClickMethod::Synthetic);
    let harness = Harness::new(driver);

    let err = harness.radios().select(&region(), "해외").await.unwrap_err();
    assert!(matches!(err, RadioError::Unverified { ref label, .. } if label == "해외"));
    assert!(err.is_retryable());

    let lenient = region().with_verify(VerifyPolicy::BestEffort);
    let outcome = harness.radios().select(&lenient, "해외").await.unwrap();
    assert_eq!(outcome, RadioOutcome::Unverified);
}

#[tokio::test]
async fn test_unknown_label_is_not_found() {
    let driver = page();
    add_group(&driver, "area", &["전체", "국내", "해외"], false);
    let harness = Harness::new(driver);

    let err = harness.radios().select(&region(), "해외60").await.unwrap_err();
    assert!(matches!(err, RadioError::OptionNotFound { .. }));
}
