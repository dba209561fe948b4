//! Failure-point diagnostics (screenshots and page snapshots)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cdp_adapter::Driver;
use chrono::Local;
use tracing::{info, warn};

/// Receives a diagnostic capture request at a failure point.
///
/// Captures never fail the caller; problems are logged.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Screenshot of the current page state.
    async fn capture(&self, driver: &dyn Driver, label: &str);

    /// Markup of the currently addressed document.
    async fn snapshot_source(&self, driver: &dyn Driver, label: &str);
}

/// Discards every capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

#[async_trait]
impl DiagnosticSink for NoDiagnostics {
    async fn capture(&self, _driver: &dyn Driver, _label: &str) {}

    async fn snapshot_source(&self, _driver: &dyn Driver, _label: &str) {}
}

/// Writes `{label}_{timestamp}.png` / `.html` files into an artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactDiagnostics {
    dir: PathBuf,
}

impl ArtifactDiagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, label: &str, extension: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d%H%M%S%3f");
        self.dir
            .join(format!("{}_{stamp}.{extension}", sanitize(label)))
    }

    async fn write(&self, path: PathBuf, bytes: Vec<u8>) {
        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(target: "diagnostics", dir = %self.dir.display(), error = %err, "cannot create artifact dir");
            return;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => info!(target: "diagnostics", path = %path.display(), "diagnostic captured"),
            Err(err) => warn!(target: "diagnostics", path = %path.display(), error = %err, "diagnostic write failed"),
        }
    }
}

#[async_trait]
impl DiagnosticSink for ArtifactDiagnostics {
    async fn capture(&self, driver: &dyn Driver, label: &str) {
        match driver.screenshot().await {
            Ok(png) => self.write(self.path_for(label, "png"), png).await,
            Err(err) => warn!(target: "diagnostics", label, error = %err, "screenshot failed"),
        }
    }

    async fn snapshot_source(&self, driver: &dyn Driver, label: &str) {
        match driver.page_source().await {
            Ok(html) => self.write(self.path_for(label, "html"), html.into_bytes()).await,
            Err(err) => warn!(target: "diagnostics", label, error = %err, "page source failed"),
        }
    }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
