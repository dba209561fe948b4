//! In-memory replica of the portal for scenario tests.
//!
//! Builds a [`FixtureDriver`] page with the navigation menu, the query form
//! (script-rendered dropdowns whose lists are appended to the document root,
//! radio groups including a hidden duplicate) and search/export buttons. An
//! export writes a file into the session's download directory the way a
//! browser does: first under an in-progress name, then renamed.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use cdp_adapter::fixture::{ElementSpec, FixtureDriver, FixtureState};
use parking_lot::Mutex;
use tool_radio_group::{radio_by_label, GROUP_XPATH, MEMBER_XPATH};
use tool_select_option::{option_exact_xpaths, CURRENT_TEXT_XPATH, LISTBOX_XPATH, OPTION_TEXT_XPATH};

use crate::site::{
    ANY_RADIO, ASSET_WEIGHT, COMBOBOX, EXPORT_BUTTON, FRAME_NAME, FUND_CATEGORY, FUND_INDUSTRY,
    FUND_TAB, FUND_TYPE_FALLBACK, PERIOD_CONTROL, RESULT_ROWS, SEARCH_BUTTON, STATS_EXPAND,
    STATS_LANDMARK, TREND_TAB,
};

pub const FUND_TYPES: &[&str] = &[
    "전체",
    "주식형",
    "혼합주식형",
    "혼합채권형",
    "채권형",
    "혼합자산",
    "단기금융",
];
/// Fund types rendered only after the list is wheel-scrolled.
const LAZY_FUND_TYPES: &[&str] = &["혼합자산", "단기금융"];
pub const REGIONS: &[&str] = &["전체", "국내", "해외", "해외30", "해외60"];

#[derive(Default)]
struct PlanState {
    failures: HashMap<String, u32>,
    exports: Vec<String>,
    broken_search: bool,
}

/// Export behaviour shared by every fixture page of a run, so a failure
/// scheduled for a dataset holds whichever session picks it up.
#[derive(Clone, Default)]
pub struct ExportPlan {
    state: Arc<Mutex<PlanState>>,
}

impl ExportPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` exports for this fund type and region produce no file.
    pub fn fail_exports(&self, fund_type: &str, region: &str, count: u32) -> &Self {
        self.state
            .lock()
            .failures
            .insert(export_key(fund_type, region), count);
        self
    }

    /// Search returns an empty grid.
    pub fn break_search(&self) -> &Self {
        self.state.lock().broken_search = true;
        self
    }

    /// `fund_type/region` of every export that produced a file, in order.
    pub fn exports(&self) -> Vec<String> {
        self.state.lock().exports.clone()
    }

    fn take_failure(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        match state.failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn record(&self, key: String) {
        self.state.lock().exports.push(key);
    }

    fn search_broken(&self) -> bool {
        self.state.lock().broken_search
    }
}

pub fn export_key(fund_type: &str, region: &str) -> String {
    format!("{fund_type}/{region}")
}

/// One replica page bound to a download directory.
pub struct SiteFixture {
    driver: FixtureDriver,
    download_dir: PathBuf,
}

impl SiteFixture {
    pub fn new(download_dir: impl Into<PathBuf>, plan: ExportPlan) -> Self {
        let fixture = Self {
            driver: FixtureDriver::new(),
            download_dir: download_dir.into(),
        };
        fixture.build(plan);
        fixture
    }

    pub fn driver(&self) -> FixtureDriver {
        self.driver.clone()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    fn build(&self, plan: ExportPlan) {
        let driver = &self.driver;
        driver.on_navigate(|state, _| state.add_frame(FRAME_NAME));
        driver.with_state(|state| {
            state.set_page_source("<html><frameset><frame name=\"main\"></frameset></html>")
        });
        self.build_menu();
        self.build_dropdowns();
        self.build_radios();
        self.build_buttons(plan);
    }

    fn build_menu(&self) {
        let driver = &self.driver;
        for (key, expr) in [
            ("fund_tab", FUND_TAB[0]),
            ("fund_industry", FUND_INDUSTRY[0]),
            ("stats_icon", STATS_EXPAND[0]),
            ("trend_tab", TREND_TAB[0]),
        ] {
            driver.add(in_main(key).locator(expr));
        }
        driver.add(
            in_main("asset_weight")
                .locator(ASSET_WEIGHT[0])
                .locator(STATS_LANDMARK[0])
                .hidden(),
        );
        driver.on_click("stats_icon", |state, _| state.set_visible("asset_weight", true));
    }

    fn build_dropdowns(&self) {
        self.dropdown(
            "period",
            &[PERIOD_CONTROL[0], COMBOBOX, "(//div[@role='combobox'])[1]"],
            "1년",
            &["1년", "3년", "5년"],
            &[],
        );
        self.dropdown(
            "fund_type",
            &[FUND_TYPE_FALLBACK[0], COMBOBOX, "(//div[@role='combobox'])[2]"],
            "전체",
            FUND_TYPES,
            LAZY_FUND_TYPES,
        );
        self.dropdown(
            "category",
            &[FUND_CATEGORY[0], COMBOBOX, "(//div[@role='combobox'])[3]"],
            "증권",
            &["전체", "증권", "부동산", "특별자산"],
            &[],
        );
    }

    /// Control in the content frame; its option list lives in the root
    /// document and exists only while open.
    fn dropdown(
        &self,
        name: &str,
        locators: &[&str],
        initial: &str,
        options: &[&str],
        lazy: &[&str],
    ) {
        let driver = &self.driver;
        let control = name.to_string();
        let text = format!("{name}_text");
        let list = format!("{name}_list");

        let mut spec = in_main(&control).attr("aria-expanded", "false");
        for expr in locators {
            spec = spec.locator(*expr);
        }
        driver
            .add(spec)
            .add(
                in_main(&text)
                    .parent(&control)
                    .locator(CURRENT_TEXT_XPATH)
                    .text(initial),
            )
            .add(ElementSpec::new(&list).locator(LISTBOX_XPATH).detached());

        let mut lazy_keys = Vec::new();
        for (index, label) in options.iter().enumerate() {
            let key = format!("{list}_{index}");
            let mut option = ElementSpec::new(&key)
                .parent(&list)
                .locator(option_exact_xpaths(label)[0].clone())
                .locator(OPTION_TEXT_XPATH)
                .text(*label);
            if lazy.contains(label) {
                option = option.detached();
                lazy_keys.push(key.clone());
            }
            driver.add(option);

            let (control, text, list, label) =
                (control.clone(), text.clone(), list.clone(), label.to_string());
            driver.on_click(key, move |state, _| {
                state.set_text(&text, label.clone());
                set_open(state, &control, &list, false);
            });
        }

        {
            let (control, list) = (control.clone(), list.clone());
            driver.on_click(&control.clone(), move |state, _| {
                let open = state.attr(&control, "aria-expanded").as_deref() == Some("true");
                set_open(state, &control, &list, !open);
            });
        }
        if !lazy_keys.is_empty() {
            driver.on_wheel(&list, move |state, _| {
                for key in &lazy_keys {
                    state.attach(key);
                }
            });
        }
    }

    fn build_radios(&self) {
        self.radio_group("region_ghost", REGIONS, "전체", true);
        self.radio_group("region", REGIONS, "전체", false);
        self.radio_group("scope", &["전체", "공모", "사모"], "공모", false);
        self.radio_group("periodicity", &["월간", "분기", "년간"], "년간", false);
    }

    fn radio_group(&self, group: &str, labels: &[&str], checked: &str, hidden: bool) {
        let driver = &self.driver;
        driver.add(in_main(group).locator(GROUP_XPATH).attr("role", "radiogroup"));
        let members: Vec<String> = labels.iter().map(|label| format!("{group}_{label}")).collect();
        for (label, key) in labels.iter().zip(&members) {
            let mut spec = in_main(key)
                .parent(group)
                .locator(radio_by_label(label).expr)
                .locator(MEMBER_XPATH)
                .locator(ANY_RADIO)
                .attr("aria-label", *label)
                .attr("aria-checked", if *label == checked { "true" } else { "false" });
            if hidden {
                spec = spec.hidden();
            }
            driver.add(spec);

            let (me, all) = (key.clone(), members.clone());
            driver.on_click(key, move |state, _| {
                for member in &all {
                    state.set_attr(member, "aria-checked", if *member == me { "true" } else { "false" });
                }
            });
        }
    }

    fn build_buttons(&self, plan: ExportPlan) {
        let driver = &self.driver;
        driver
            .add(in_main("search_button").locator(SEARCH_BUTTON[0]))
            .add(in_main("export_button").locator(EXPORT_BUTTON[0]));
        for row in 0..4 {
            driver.add(
                in_main(format!("row_{row}"))
                    .locator(RESULT_ROWS)
                    .attr("aria-rowindex", row.to_string())
                    .detached(),
            );
        }

        let search_plan = plan.clone();
        driver.on_click("search_button", move |state, _| {
            for row in 0..4 {
                if row < 2 || !search_plan.search_broken() {
                    state.attach(&format!("row_{row}"));
                }
            }
        });

        let dir = self.download_dir.clone();
        let counter = Arc::new(AtomicU32::new(0));
        driver.on_click("export_button", move |state, _| {
            let fund_type = state.text("fund_type_text").unwrap_or_default();
            let region = REGIONS
                .iter()
                .find(|label| {
                    state.attr(&format!("region_{label}"), "aria-checked").as_deref() == Some("true")
                })
                .copied()
                .unwrap_or("?");
            let key = export_key(&fund_type, region);
            if plan.take_failure(&key) {
                return;
            }
            plan.record(key.clone());
            state.raise_dialog();
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(write_export(dir.clone(), n, key));
        });
    }
}

fn in_main(key: impl Into<String>) -> ElementSpec {
    ElementSpec::new(key).frame(FRAME_NAME)
}

fn set_open(state: &mut FixtureState, control: &str, list: &str, open: bool) {
    state.set_attr(control, "aria-expanded", if open { "true" } else { "false" });
    if open {
        state.attach(list);
    } else {
        state.detach(list);
    }
}

/// Write like a browser: partial file under an in-progress name, then the
/// final name.
async fn write_export(dir: PathBuf, n: u32, key: String) {
    let final_path = dir.join(format!("fund_asset_weight_{n}.xls"));
    let partial = dir.join(format!("fund_asset_weight_{n}.xls.crdownload"));
    if tokio::fs::create_dir_all(&dir).await.is_err() {
        return;
    }
    let body = format!("{key}\n");
    if tokio::fs::write(&partial, &body.as_bytes()[..1]).await.is_err() {
        return;
    }
    tokio::time::sleep(Duration::from_millis(15)).await;
    if tokio::fs::write(&partial, body.as_bytes()).await.is_err() {
        return;
    }
    let _ = tokio::fs::rename(&partial, &final_path).await;
}
