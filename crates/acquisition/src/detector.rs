//! Download completion detection
//!
//! The browser writes exports under a temporary name and renames them when
//! done. A file counts as finished once it is new relative to a baseline
//! listing, carries no in-progress suffix, and its size holds still. A name
//! whose in-progress form was already present at baseline time belongs to an
//! earlier export and never qualifies.

use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use action_primitives::Pacer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AcquireError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub poll_interval_ms: u64,
    /// Size samples taken per candidate and poll.
    pub size_samples: u32,
    pub sample_spacing_ms: u64,
    pub in_progress_suffixes: Vec<String>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            size_samples: 5,
            sample_spacing_ms: 200,
            in_progress_suffixes: vec![".tmp".into(), ".crdownload".into(), ".part".into()],
        }
    }
}

impl DetectorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sample_spacing(&self) -> Duration {
        Duration::from_millis(self.sample_spacing_ms)
    }
}

/// Directory listing taken before an export is triggered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Baseline {
    names: BTreeSet<String>,
    /// Final names of downloads that were still in progress.
    pending: BTreeSet<String>,
}

impl Baseline {
    /// True for names listed at baseline time and for the finished form of
    /// any download that was in progress then.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || self.pending.contains(name)
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Watches one download directory.
#[derive(Clone, Debug)]
pub struct DownloadDetector {
    dir: PathBuf,
    settings: DetectorSettings,
}

enum Sample {
    Stable(u64),
    Growing,
    Vanished,
}

impl DownloadDetector {
    pub fn new(dir: impl Into<PathBuf>, settings: DetectorSettings) -> Self {
        Self {
            dir: dir.into(),
            settings,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_in_progress(&self, name: &str) -> bool {
        self.final_name(name).is_some()
    }

    /// `x.xls` for `x.xls.crdownload`; `None` for a finished name.
    fn final_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        self.settings
            .in_progress_suffixes
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix.as_str()))
    }

    /// Names currently in the directory; a missing directory is created.
    pub async fn snapshot(&self) -> io::Result<Baseline> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let names = self.list().await?;
        let pending: BTreeSet<String> = names
            .iter()
            .filter_map(|name| self.final_name(name))
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .collect();
        if !pending.is_empty() {
            warn!(
                target: "download",
                dir = %self.dir.display(),
                pending = ?pending,
                "earlier downloads still in progress; their files will be ignored"
            );
        }
        Ok(Baseline { names, pending })
    }

    /// Wait for a finished file that is not part of `baseline`.
    ///
    /// Steps:
    /// 1. List the directory every `poll_interval`.
    /// 2. Skip baseline entries (including finished forms of downloads that
    ///    were pending at baseline time), hidden entries and in-progress names.
    /// 3. Sample each candidate's size; two equal, nonzero consecutive
    ///    samples mark it finished. A candidate that vanishes while being
    ///    sampled is dropped for this poll.
    pub async fn await_new_file(
        &self,
        baseline: &Baseline,
        timeout: Duration,
        pacer: &Pacer,
    ) -> Result<PathBuf, AcquireError> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            for name in self.list().await? {
                if baseline.contains(&name) || name.starts_with('.') || self.is_in_progress(&name) {
                    continue;
                }
                let path = self.dir.join(&name);
                match self.sample(&path, pacer).await? {
                    Sample::Stable(size) => {
                        info!(
                            target: "download",
                            file = %path.display(),
                            size,
                            waited_ms = started.elapsed().as_millis() as u64,
                            "download complete"
                        );
                        return Ok(path);
                    }
                    Sample::Growing => {
                        debug!(target: "download", file = %name, "download still being written");
                    }
                    Sample::Vanished => {
                        debug!(target: "download", file = %name, "candidate vanished while sampling");
                    }
                }
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(target: "download", dir = %self.dir.display(), "no finished download before timeout");
                return Err(AcquireError::DownloadTimeout {
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            pacer
                .tick(self.settings.poll_interval().min(deadline - now))
                .await?;
        }
    }

    async fn sample(&self, path: &Path, pacer: &Pacer) -> Result<Sample, AcquireError> {
        let mut previous = None;
        for index in 0..self.settings.size_samples.max(2) {
            if index > 0 {
                pacer
                    .tick(self.settings.sample_spacing())
                    .await?;
            }
            let size = match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => return Ok(Sample::Vanished),
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Sample::Vanished),
                Err(err) => return Err(err.into()),
            };
            if size > 0 && previous == Some(size) {
                return Ok(Sample::Stable(size));
            }
            previous = Some(size);
        }
        Ok(Sample::Growing)
    }

    async fn list(&self) -> io::Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }
}
