//! Navigation flow model

use std::fmt;

use action_locator::LocatorSet;
use action_primitives::SettleRange;
use cdp_adapter::Locator;
use serde::{Deserialize, Serialize};

use crate::errors::NavigationError;

/// Milestones between the portal's entry page and the query form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    EntryLoaded,
    MainFrameEntered,
    FundTabClicked,
    IndustryMenuClicked,
    StatsMenuExpanded,
    AssetWeightClicked,
    /// Query form reachable.
    TrendTabClicked,
}

impl NavState {
    pub fn label(&self) -> &'static str {
        match self {
            NavState::EntryLoaded => "entry_loaded",
            NavState::MainFrameEntered => "main_frame_entered",
            NavState::FundTabClicked => "fund_tab_clicked",
            NavState::IndustryMenuClicked => "industry_menu_clicked",
            NavState::StatsMenuExpanded => "stats_menu_expanded",
            NavState::AssetWeightClicked => "asset_weight_clicked",
            NavState::TrendTabClicked => "trend_tab_clicked",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, NavState::TrendTabClicked)
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Landmark proving a click took effect, with the number of clicks allowed
/// to produce it.
#[derive(Debug, Clone)]
pub struct ExpectLandmark {
    pub landmark: LocatorSet,
    pub max_attempts: u32,
    pub timeout_ms: u64,
}

/// One click transition.
#[derive(Debug, Clone)]
pub struct NavStep {
    /// State reached once the step succeeds.
    pub state: NavState,
    pub target: LocatorSet,
    pub settle: SettleRange,
    pub expect: Option<ExpectLandmark>,
}

impl NavStep {
    pub fn new(state: NavState, target: LocatorSet, settle: SettleRange) -> Self {
        Self {
            state,
            target,
            settle,
            expect: None,
        }
    }

    pub fn expect(mut self, landmark: LocatorSet, max_attempts: u32, timeout_ms: u64) -> Self {
        self.expect = Some(ExpectLandmark {
            landmark,
            max_attempts: max_attempts.max(1),
            timeout_ms,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct NavigationFlow {
    pub entry_url: String,
    /// Pause after entering the content frame.
    pub frame_settle: SettleRange,
    pub steps: Vec<NavStep>,
}

impl NavigationFlow {
    pub fn new(entry_url: impl Into<String>) -> Self {
        Self {
            entry_url: entry_url.into(),
            frame_settle: SettleRange::new(2_000, 4_000),
            steps: Vec::new(),
        }
    }

    pub fn with_frame_settle(mut self, settle: SettleRange) -> Self {
        self.frame_settle = settle;
        self
    }

    pub fn step(mut self, step: NavStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Steps must advance strictly past `MainFrameEntered`.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.entry_url.trim().is_empty() {
            return Err(NavigationError::InvalidFlow("entry url is empty".into()));
        }
        let mut previous = NavState::MainFrameEntered;
        for step in &self.steps {
            if step.state <= previous {
                return Err(NavigationError::InvalidFlow(format!(
                    "step {} does not advance past {previous}",
                    step.state
                )));
            }
            if step.target.is_empty() {
                return Err(NavigationError::InvalidFlow(format!(
                    "step {} has no locators",
                    step.state
                )));
            }
            previous = step.state;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub state: NavState,
    /// Clicks spent, including landmark re-tries.
    pub attempts: u32,
    pub locator: Option<Locator>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct NavigationReport {
    pub reached: NavState,
    pub steps: Vec<StepResult>,
    pub latency_ms: u64,
}

impl NavigationReport {
    pub fn is_ready(&self) -> bool {
        self.reached.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(state: NavState) -> NavStep {
        NavStep::new(state, LocatorSet::xpaths("x", &["//x"]), SettleRange::fixed(0))
    }

    #[test]
    fn test_validate_rejects_out_of_order_steps() {
        let flow = NavigationFlow::new("http://example.test/")
            .step(step(NavState::IndustryMenuClicked))
            .step(step(NavState::FundTabClicked));
        assert!(matches!(flow.validate(), Err(NavigationError::InvalidFlow(_))));
    }

    #[test]
    fn test_validate_accepts_ordered_steps() {
        let flow = NavigationFlow::new("http://example.test/")
            .step(step(NavState::FundTabClicked))
            .step(step(NavState::TrendTabClicked));
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_target() {
        let flow = NavigationFlow::new("http://example.test/").step(NavStep::new(
            NavState::FundTabClicked,
            LocatorSet::new("empty", Vec::new()),
            SettleRange::fixed(0),
        ));
        assert!(flow.validate().is_err());
    }

    #[test]
    fn test_ready_state() {
        assert!(NavState::TrendTabClicked.is_ready());
        assert!(!NavState::AssetWeightClicked.is_ready());
        assert_eq!(NavState::StatsMenuExpanded.to_string(), "stats_menu_expanded");
    }
}
