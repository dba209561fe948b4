use action_locator::LocatorSet;
use cdp_adapter::Locator;
use tracing::{debug, info, instrument};

use crate::{errors::DropdownError, locators::OPTION_TEXT_XPATH, runner::DropdownDriver};

/// Recognises one dropdown among many look-alikes by the labels its list
/// offers.
#[derive(Debug, Clone)]
pub struct VocabularyProbe {
    /// XPath matching every candidate control, in document order.
    pub candidates: Locator,
    /// Relative lookup from the open list to its option labels.
    pub option_text: Locator,
    pub vocabulary: Vec<String>,
    /// Distinct vocabulary labels a candidate's list must offer.
    pub min_matches: usize,
    /// Option labels read per candidate.
    pub sample: usize,
}

impl VocabularyProbe {
    pub fn new(candidates: &str, vocabulary: &[&str], min_matches: usize) -> Self {
        Self {
            candidates: Locator::xpath(candidates),
            option_text: Locator::xpath(OPTION_TEXT_XPATH),
            vocabulary: vocabulary.iter().map(|v| v.to_string()).collect(),
            min_matches: min_matches.max(1),
            sample: 10,
        }
    }

    pub fn matches(&self, labels: &[String]) -> bool {
        let mut hits: Vec<&str> = labels
            .iter()
            .map(|label| label.trim())
            .filter(|label| self.vocabulary.iter().any(|v| v == label))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.len() >= self.min_matches
    }

    fn positional(&self, index: usize) -> Locator {
        Locator::xpath(format!("({})[{}]", self.candidates.expr, index + 1))
    }
}

impl DropdownDriver<'_> {
    /// Open each visible candidate, read its first option labels and close it
    /// again. The first candidate whose labels satisfy `probe` becomes the head
    /// of the returned set, followed by `fallback`'s locators.
    ///
    /// When no candidate qualifies the fallback set is returned as is.
    #[instrument(skip_all, fields(control = name))]
    pub async fn identify(
        &self,
        probe: &VocabularyProbe,
        fallback: &LocatorSet,
        name: &str,
    ) -> Result<LocatorSet, DropdownError> {
        let driver = self.deps.driver;
        self.deps.frames.ensure_context(driver).await;
        let candidates = driver.find_all(&probe.candidates).await?;
        debug!(target: "dropdown", candidates = candidates.len(), "probing dropdown candidates");

        for (index, candidate) in candidates.iter().enumerate() {
            if !driver.is_displayed(candidate).await.unwrap_or(false) {
                continue;
            }
            let list = match self.open(candidate).await {
                Ok(list) => list,
                Err(DropdownError::Cancelled) => return Err(DropdownError::Cancelled),
                Err(err) => {
                    debug!(target: "dropdown", index, error = %err, "candidate did not open");
                    self.deps.frames.reenter(driver).await?;
                    continue;
                }
            };
            let labels = self.sample_labels(&list.element, probe).await;
            self.close(candidate, &list).await;
            debug!(target: "dropdown", index, ?labels, "candidate labels");
            if probe.matches(&labels) {
                info!(target: "dropdown", index, "dropdown identified by its options");
                let mut locators = vec![probe.positional(index)];
                locators.extend(fallback.locators().iter().cloned());
                return Ok(LocatorSet::new(name, locators));
            }
        }
        info!(target: "dropdown", "no candidate matched, using fallback locators");
        Ok(LocatorSet::new(name, fallback.locators().to_vec()))
    }

    async fn sample_labels(
        &self,
        list: &cdp_adapter::ElementRef,
        probe: &VocabularyProbe,
    ) -> Vec<String> {
        let driver = self.deps.driver;
        let Ok(options) = driver.find_within(list, &probe.option_text).await else {
            return Vec::new();
        };
        let mut labels = Vec::new();
        for option in options.iter().take(probe.sample) {
            if let Ok(text) = driver.text(option).await {
                labels.push(text.trim().to_string());
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_requires_distinct_hits() {
        let probe = VocabularyProbe::new("//div[@role='combobox']", &["주식형", "채권형", "전체"], 2);
        let labels = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(!probe.matches(&labels(&["전체", "공모", "사모"])));
        assert!(!probe.matches(&labels(&["전체", "전체"])));
        assert!(probe.matches(&labels(&["전체", " 주식형 "])));
    }

    #[test]
    fn test_positional_locator_is_one_based() {
        let probe = VocabularyProbe::new("//div[@role='combobox']", &["전체"], 1);
        assert_eq!(probe.positional(2).expr, "(//div[@role='combobox'])[3]");
    }
}
