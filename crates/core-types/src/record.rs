use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::SessionId;

/// A finished export that was moved to its dataset-scoped name.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRecord {
    pub source: PathBuf,
    pub target: PathBuf,
    pub dataset: String,
    pub success: bool,
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub success: bool,
    pub attempts: u32,
}

impl DatasetOutcome {
    pub fn new(dataset: impl Into<String>, success: bool, attempts: u32) -> Self {
        Self {
            dataset: dataset.into(),
            success,
            attempts,
        }
    }

    pub fn failed(dataset: impl Into<String>) -> Self {
        Self::new(dataset, false, 0)
    }
}

/// Ordered outcomes produced by one session.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionResult {
    pub session: SessionId,
    pub outcomes: Vec<DatasetOutcome>,
    pub downloads: Vec<DownloadRecord>,
    /// False when the session hit a fatal error (navigation, browser loss).
    pub healthy: bool,
}

impl SessionResult {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            outcomes: Vec::new(),
            downloads: Vec::new(),
            healthy: true,
        }
    }

    /// `(dataset, success)` pairs in processing order.
    pub fn pairs(&self) -> Vec<(String, bool)> {
        self.outcomes
            .iter()
            .map(|o| (o.dataset.clone(), o.success))
            .collect()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.dataset.clone())
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}

/// Merged first-pass and retry-pass results for a whole run.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunTally {
    pub first_pass: Vec<DatasetOutcome>,
    pub retry_pass: Vec<DatasetOutcome>,
}

impl RunTally {
    /// Final status per dataset; a retry success overrides a first-pass failure.
    pub fn final_status(&self) -> BTreeMap<String, bool> {
        let mut status = BTreeMap::new();
        for outcome in &self.first_pass {
            status.insert(outcome.dataset.clone(), outcome.success);
        }
        for outcome in &self.retry_pass {
            let entry = status.entry(outcome.dataset.clone()).or_insert(false);
            *entry = *entry || outcome.success;
        }
        status
    }

    pub fn succeeded(&self) -> Vec<String> {
        self.final_status()
            .into_iter()
            .filter(|(_, ok)| *ok)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn finally_failed(&self) -> Vec<String> {
        self.final_status()
            .into_iter()
            .filter(|(_, ok)| !*ok)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn first_pass_failures(&self) -> Vec<String> {
        self.first_pass
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.dataset.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.final_status().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_success_clears_failure() {
        let tally = RunTally {
            first_pass: vec![
                DatasetOutcome::new("Equity", true, 1),
                DatasetOutcome::new("Bond", false, 3),
            ],
            retry_pass: vec![DatasetOutcome::new("Bond", true, 1)],
        };
        assert!(tally.finally_failed().is_empty());
        assert_eq!(tally.first_pass_failures(), vec!["Bond".to_string()]);
        assert_eq!(tally.total(), 2);
    }

    #[test]
    fn test_failure_in_both_passes_is_final() {
        let tally = RunTally {
            first_pass: vec![DatasetOutcome::new("Bond", false, 3)],
            retry_pass: vec![DatasetOutcome::new("Bond", false, 3)],
        };
        assert_eq!(tally.finally_failed(), vec!["Bond".to_string()]);
        assert!(tally.succeeded().is_empty());
    }

    #[test]
    fn test_session_result_pairs() {
        let mut result = SessionResult::new(SessionId::numbered(1));
        result.outcomes.push(DatasetOutcome::new("Equity", true, 1));
        result.outcomes.push(DatasetOutcome::new("Bond", false, 3));
        assert_eq!(
            result.pairs(),
            vec![("Equity".to_string(), true), ("Bond".to_string(), false)]
        );
        assert_eq!(result.failed_names(), vec!["Bond".to_string()]);
        assert_eq!(result.success_count(), 1);
    }
}
