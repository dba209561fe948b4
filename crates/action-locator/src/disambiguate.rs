//! Disambiguation predicates
//!
//! Pages often carry several elements matching the same locator (hidden
//! duplicates, identically-labelled controls in different groups). A
//! [`Disambiguator`] decides which candidate is the intended one.

use async_trait::async_trait;
use cdp_adapter::{Driver, DriverError, ElementRef, Locator};
use tracing::debug;

#[async_trait]
pub trait Disambiguator: Send + Sync {
    fn describe(&self) -> String;

    async fn accept(&self, driver: &dyn Driver, candidate: &ElementRef)
        -> Result<bool, DriverError>;
}

/// Candidate must be displayed and enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interactable;

#[async_trait]
impl Disambiguator for Interactable {
    fn describe(&self) -> String {
        "visible and enabled".to_string()
    }

    async fn accept(
        &self,
        driver: &dyn Driver,
        candidate: &ElementRef,
    ) -> Result<bool, DriverError> {
        Ok(driver.is_displayed(candidate).await? && driver.is_enabled(candidate).await?)
    }
}

/// Candidate's enclosing group must contain enough members whose labels
/// belong to an expected vocabulary.
#[derive(Debug, Clone)]
pub struct SiblingVocabulary {
    /// Relative lookup from the candidate to its group container.
    pub group: Locator,
    /// Relative lookup from the group container to its members.
    pub members: Locator,
    /// Attribute holding a member's label; falls back to its text.
    pub label_attr: String,
    pub vocabulary: Vec<String>,
    /// Distinct vocabulary labels required among the members.
    pub min_matches: usize,
}

impl SiblingVocabulary {
    pub fn new(
        group: Locator,
        members: Locator,
        label_attr: impl Into<String>,
        vocabulary: &[&str],
        min_matches: usize,
    ) -> Self {
        Self {
            group,
            members,
            label_attr: label_attr.into(),
            vocabulary: vocabulary.iter().map(|v| v.to_string()).collect(),
            min_matches: min_matches.max(1),
        }
    }

    /// Labels of every member in the candidate's group.
    pub async fn sibling_labels(
        &self,
        driver: &dyn Driver,
        candidate: &ElementRef,
    ) -> Result<Vec<String>, DriverError> {
        let Some(group) = driver
            .find_within(candidate, &self.group)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(Vec::new());
        };
        let mut labels = Vec::new();
        for member in driver.find_within(&group, &self.members).await? {
            let label = match driver.attribute(&member, &self.label_attr).await? {
                Some(label) => label,
                None => driver.text(&member).await?,
            };
            labels.push(label.trim().to_string());
        }
        Ok(labels)
    }

    pub fn matches(&self, labels: &[String]) -> bool {
        let mut hits: Vec<&str> = labels
            .iter()
            .map(String::as_str)
            .filter(|label| self.vocabulary.iter().any(|v| v == label))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits.len() >= self.min_matches
    }
}

#[async_trait]
impl Disambiguator for SiblingVocabulary {
    fn describe(&self) -> String {
        format!(
            "group siblings include {} of {:?}",
            self.min_matches, self.vocabulary
        )
    }

    async fn accept(
        &self,
        driver: &dyn Driver,
        candidate: &ElementRef,
    ) -> Result<bool, DriverError> {
        let labels = self.sibling_labels(driver, candidate).await?;
        let accepted = self.matches(&labels);
        debug!(target: "locator", candidate = %candidate, siblings = ?labels, accepted, "sibling vocabulary check");
        Ok(accepted)
    }
}

/// Every inner predicate must accept.
pub struct AllOf(pub Vec<Box<dyn Disambiguator>>);

#[async_trait]
impl Disambiguator for AllOf {
    fn describe(&self) -> String {
        self.0
            .iter()
            .map(|inner| inner.describe())
            .collect::<Vec<_>>()
            .join(" and ")
    }

    async fn accept(
        &self,
        driver: &dyn Driver,
        candidate: &ElementRef,
    ) -> Result<bool, DriverError> {
        for inner in &self.0 {
            if !inner.accept(driver, candidate).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
