use std::{path::PathBuf, sync::Arc, time::Duration};

use action_locator::{DiagnosticSink, ResolveOptions};
use action_primitives::{Pacer, RetryPolicy};
use fundstat_acquisition::{AcquireSettings, SiteProfile};
use fundstat_core_types::DatasetConfig;

use crate::metrics::RunMetrics;

/// Static inputs shared by every session of a run.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub site: SiteProfile,
    pub acquire: AcquireSettings,
    /// Default element lookup for navigation and widgets.
    pub element: ResolveOptions,
    /// Finished exports end up here as `{output_name}.xls`.
    pub download_dir: PathBuf,
    /// Delay between the starts of parallel sessions.
    pub stagger: Duration,
}

impl OrchestratorConfig {
    pub fn new(site: SiteProfile, acquire: AcquireSettings, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            site,
            acquire,
            element: ResolveOptions::new(Duration::from_secs(30), RetryPolicy::new(3, 1_000, 500)),
            download_dir: download_dir.into(),
            stagger: Duration::from_secs(2),
        }
    }

    pub fn with_element(mut self, element: ResolveOptions) -> Self {
        self.element = element;
        self
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// Private download directory of session `index`.
    pub fn staging_dir(&self, index: usize) -> PathBuf {
        self.download_dir.join(format!(".session-{index}"))
    }
}

/// Cheap-to-clone handle on everything a session borrows from the run.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<OrchestratorConfig>,
    pub pacer: Pacer,
    pub diagnostics: Arc<dyn DiagnosticSink>,
    pub metrics: Arc<RunMetrics>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    First,
    Retry,
}

impl Pass {
    pub fn label(&self) -> &'static str {
        match self {
            Pass::First => "first",
            Pass::Retry => "retry",
        }
    }
}

/// Split `datasets` into at most `sessions` contiguous batches whose sizes
/// differ by at most one; earlier batches take the remainder.
pub fn partition(datasets: &[DatasetConfig], sessions: usize) -> Vec<Vec<DatasetConfig>> {
    let sessions = sessions.max(1).min(datasets.len().max(1));
    let base = datasets.len() / sessions;
    let extra = datasets.len() % sessions;
    let mut batches = Vec::with_capacity(sessions);
    let mut start = 0;
    for index in 0..sessions {
        let len = base + usize::from(index < extra);
        if len == 0 {
            break;
        }
        batches.push(datasets[start..start + len].to_vec());
        start += len;
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundstat_core_types::builtin_catalog;

    fn names(batch: &[DatasetConfig]) -> Vec<&str> {
        batch.iter().map(|d| d.output_name.as_str()).collect()
    }

    #[test]
    fn test_partition_catalog_into_three() {
        let catalog = builtin_catalog();
        let batches = partition(&catalog, 3);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        assert_eq!(
            names(&batches[1]),
            vec!["HybridBond", "HybridDomesticBond", "Bond", "DomesticBond"]
        );
    }

    #[test]
    fn test_partition_more_sessions_than_datasets() {
        let catalog = builtin_catalog();
        let batches = partition(&catalog[..2], 5);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|batch| batch.len() == 1));
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(&[], 3).is_empty());
        assert_eq!(partition(&builtin_catalog(), 0).len(), 1);
    }

    #[test]
    fn test_staging_dir_per_session() {
        let config = OrchestratorConfig::new(SiteProfile::default(), AcquireSettings::default(), "downloads");
        assert_eq!(config.staging_dir(2), PathBuf::from("downloads/.session-2"));
    }
}
