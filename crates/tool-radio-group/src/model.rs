use action_locator::SiblingVocabulary;
use action_primitives::SettleRange;
use cdp_adapter::Locator;
use serde::{Deserialize, Serialize};

use crate::locators::{GROUP_XPATH, MEMBER_XPATH};

/// What to do when no click strategy flips the checked state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyPolicy {
    /// Fail the selection; the caller retries the dataset.
    #[default]
    Strict,
    /// Log a warning and carry on.
    BestEffort,
}

/// One logical radio group, recognised by its members' labels.
#[derive(Clone, Debug)]
pub struct RadioGroup {
    pub name: String,
    pub siblings: SiblingVocabulary,
    pub verify: VerifyPolicy,
    pub click_settle: SettleRange,
}

impl RadioGroup {
    /// Group whose members carry at least `min_matches` labels of `vocabulary`
    /// in `aria-label`.
    pub fn new(name: impl Into<String>, vocabulary: &[&str], min_matches: usize) -> Self {
        Self {
            name: name.into(),
            siblings: SiblingVocabulary::new(
                Locator::xpath(GROUP_XPATH),
                Locator::xpath(MEMBER_XPATH),
                "aria-label",
                vocabulary,
                min_matches,
            ),
            verify: VerifyPolicy::Strict,
            click_settle: SettleRange::new(500, 1_000),
        }
    }

    pub fn with_verify(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_click_settle(mut self, settle: SettleRange) -> Self {
        self.click_settle = settle;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadioOutcome {
    AlreadyChecked,
    Checked { strategy: &'static str },
    /// Only under [`VerifyPolicy::BestEffort`].
    Unverified,
}
