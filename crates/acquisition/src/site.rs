//! Portal layout: locators, vocabularies and pacing.
//!
//! The portal is a frame-based single page application with no stable ids,
//! so every target is an ordered list of alternatives.

use action_flow::{NavState, NavStep, NavigationFlow};
use action_locator::LocatorSet;
use action_primitives::SettleRange;
use cdp_adapter::Locator;
use serde::{Deserialize, Serialize};
use tool_radio_group::RadioGroup;
use tool_select_option::VocabularyProbe;

pub const BASE_URL: &str = "http://freesis.kofia.or.kr/";
pub const FRAME_NAME: &str = "main";
/// Fund tab image; present only inside the content frame.
pub const LANDMARK: &str = "//img[@alt='펀드']";

pub const FUND_TAB: &[&str] = &[
    "//img[@alt='펀드']",
    "//a[img[@alt='펀드']]",
    "//li[@class='menu2']//a[contains(@href,'MSIS40100000000000')]",
    "//a[contains(@href,'MSIS40100000000000')]",
];
pub const FUND_INDUSTRY: &[&str] = &["//div[@data-itemid='MSIS40100000000000']"];
pub const STATS_EXPAND: &[&str] = &[
    "//div[contains(@class, 'cl-tree-item')][@title='운용통계']//div[contains(@class, 'cl-tree-treeicon')]",
    "//div[@title='운용통계']//preceding-sibling::div[contains(@class, 'cl-tree-treeicon')]",
    "//div[@title='운용통계']/../..//div[contains(@class, 'cl-tree-treeicon')]",
];
pub const STATS_LANDMARK: &[&str] = &["//div[@title='투자자산별비중']"];
pub const ASSET_WEIGHT: &[&str] = &[
    "//div[contains(@class, 'cl-tree-item') and @title='운용통계']//following-sibling::div//div[@title='투자자산별비중']",
    "//div[contains(@class, 'cl-tree-item') and @title='운용통계']/..//div[@title='투자자산별비중']",
    "//div[@class='sub-items']//div[contains(@class, 'cl-tree-item')][@title='투자자산별비중']",
    "//div[contains(@class, 'cl-tree-item')][@title='투자자산별비중']",
    "//*[text()='투자자산별비중']",
];
pub const TREND_TAB: &[&str] = &[
    "//div[contains(@class, 'cl-tabfolder-item')]//div[@class='cl-text' and text()='추이']",
    "//div[@role='tab' and text()='추이']",
    "//div[contains(@class, 'cl-text') and text()='추이']",
    "//*[text()='추이']",
];

pub const PERIOD_CONTROL: &[&str] = &[
    "//div[@title='조회기간(월단위)']//div[@role='combobox']",
    "//div[@title='조회기간(월단위)']",
];
pub const COMBOBOX: &str = "//div[@role='combobox']";
pub const FUND_TYPE_FALLBACK: &[&str] = &[
    "//div[@title='펀드유형']//div[@role='combobox']",
    "//div[@title='펀드유형']",
];
pub const FUND_TYPE_VOCABULARY: &[&str] =
    &["주식형", "혼합주식형", "혼합채권형", "채권형", "단기금융", "전체"];
pub const FUND_CATEGORY: &[&str] = &[
    "//div[@title='펀드종류']//div[@role='combobox']",
    "//div[@title='펀드종류']",
];
pub const REGION_VOCABULARY: &[&str] = &["전체", "국내", "해외", "해외30", "해외60"];
pub const SCOPE_VOCABULARY: &[&str] = &["공모", "사모"];
pub const PERIODICITY_VOCABULARY: &[&str] = &["년간", "분기"];
pub const ALL: &str = "전체";
pub const MONTHLY: &str = "월간";

pub const FORM_PLACEHOLDER: &str = "//div[@class='cl-form-placeholder']";
/// Form is considered rendered below this many placeholders.
pub const PLACEHOLDER_LIMIT: usize = 10;
pub const ANY_RADIO: &str = "//span[@role='radio']";

pub const SEARCH_BUTTON: &[&str] = &[
    "//a[@role='button' and .//div[text()='조회']]",
    "//div[contains(@class, 'cl-button')]//div[text()='조회']/ancestor::a[@role='button']",
    "//div[text()='조회']/ancestor::a[@role='button']",
];
pub const RESULT_ROWS: &str = "//div[@role='row' and @aria-rowindex]";
/// Header rows always present in the grid.
pub const HEADER_ROWS: usize = 2;
pub const RESULT_COUNTER: &str = "//*[contains(text(), '총') and contains(text(), '건')]";
pub const EXPORT_BUTTON: &[&str] = &[
    "//a[@role='button' and .//div[contains(@style, 'icon-file-excel')]]",
    "//a[@role='button' and @title='EXCEL저장']",
    "//div[contains(@style, 'icon-file-excel')]/ancestor::a[@role='button']",
    "//div[contains(@class, 'cl-icon') and contains(@style, 'icon-file-excel')]",
];

/// Settle intervals between navigation steps. The portal throttles or
/// blanks sessions that click faster than this.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NavPacing {
    pub frame: SettleRange,
    pub fund_tab: SettleRange,
    pub fund_industry: SettleRange,
    pub stats_expand: SettleRange,
    pub asset_weight: SettleRange,
    pub trend_tab: SettleRange,
    /// Clicks allowed for the stats menu to reveal its submenu.
    pub stats_expand_attempts: u32,
    pub stats_landmark_ms: u64,
}

impl Default for NavPacing {
    fn default() -> Self {
        Self {
            frame: SettleRange::new(2_000, 4_000),
            fund_tab: SettleRange::new(4_000, 6_000),
            fund_industry: SettleRange::new(5_000, 7_000),
            stats_expand: SettleRange::fixed(2_000),
            asset_weight: SettleRange::new(4_000, 6_000),
            trend_tab: SettleRange::new(3_000, 5_000),
            stats_expand_attempts: 3,
            stats_landmark_ms: 2_000,
        }
    }
}

/// Everything the controller and the sequencer need to know about the
/// portal's markup.
#[derive(Clone, Debug)]
pub struct SiteProfile {
    pub base_url: String,
    pub frame_name: String,
    pub landmark: Locator,
    pub pacing: NavPacing,
    pub period: LocatorSet,
    pub fund_type_probe: VocabularyProbe,
    pub fund_type_fallback: LocatorSet,
    pub fund_category: LocatorSet,
    pub region: RadioGroup,
    pub scope: RadioGroup,
    pub periodicity: RadioGroup,
    pub search: LocatorSet,
    pub export: LocatorSet,
}

impl SiteProfile {
    pub fn kofia(base_url: impl Into<String>, pacing: NavPacing) -> Self {
        Self {
            base_url: base_url.into(),
            frame_name: FRAME_NAME.to_string(),
            landmark: Locator::xpath(LANDMARK),
            pacing,
            period: LocatorSet::xpaths("period_control", PERIOD_CONTROL),
            fund_type_probe: VocabularyProbe::new(COMBOBOX, FUND_TYPE_VOCABULARY, 2),
            fund_type_fallback: LocatorSet::xpaths("fund_type_control", FUND_TYPE_FALLBACK),
            fund_category: LocatorSet::xpaths("fund_category_control", FUND_CATEGORY),
            region: RadioGroup::new("region", REGION_VOCABULARY, 2),
            scope: RadioGroup::new("public_private", SCOPE_VOCABULARY, 1),
            periodicity: RadioGroup::new("periodicity", PERIODICITY_VOCABULARY, 1),
            search: LocatorSet::xpaths("search_button", SEARCH_BUTTON),
            export: LocatorSet::xpaths("export_button", EXPORT_BUTTON),
        }
    }

    /// Entry page to the trend tab of the asset-weight statistics.
    pub fn navigation(&self) -> NavigationFlow {
        let pacing = &self.pacing;
        NavigationFlow::new(self.base_url.clone())
            .with_frame_settle(pacing.frame)
            .step(NavStep::new(
                NavState::FundTabClicked,
                LocatorSet::xpaths("fund_tab", FUND_TAB),
                pacing.fund_tab,
            ))
            .step(NavStep::new(
                NavState::IndustryMenuClicked,
                LocatorSet::xpaths("fund_industry", FUND_INDUSTRY),
                pacing.fund_industry,
            ))
            .step(
                NavStep::new(
                    NavState::StatsMenuExpanded,
                    LocatorSet::xpaths("stats_expand", STATS_EXPAND),
                    pacing.stats_expand,
                )
                .expect(
                    LocatorSet::xpaths("asset_weight_landmark", STATS_LANDMARK),
                    pacing.stats_expand_attempts,
                    pacing.stats_landmark_ms,
                ),
            )
            .step(NavStep::new(
                NavState::AssetWeightClicked,
                LocatorSet::xpaths("asset_weight", ASSET_WEIGHT),
                pacing.asset_weight,
            ))
            .step(NavStep::new(
                NavState::TrendTabClicked,
                LocatorSet::xpaths("trend_tab", TREND_TAB),
                pacing.trend_tab,
            ))
    }

    pub fn result_rows(&self) -> Locator {
        Locator::xpath(RESULT_ROWS)
    }

    pub fn result_counter(&self) -> Locator {
        Locator::xpath(RESULT_COUNTER)
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::kofia(BASE_URL, NavPacing::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_is_valid_and_ends_ready() {
        let flow = SiteProfile::default().navigation();
        assert!(flow.validate().is_ok());
        assert_eq!(flow.steps.len(), 5);
        assert!(flow.steps.last().is_some_and(|step| step.state.is_ready()));
        assert!(flow.steps[2].expect.is_some());
    }

    #[test]
    fn test_fund_type_vocabulary_requires_two_hits() {
        let probe = SiteProfile::default().fund_type_probe;
        let labels = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        // The fund category control also offers "전체".
        assert!(!probe.matches(&labels(&["전체", "증권", "부동산"])));
        assert!(probe.matches(&labels(&["전체", "주식형", "채권형"])));
    }
}
