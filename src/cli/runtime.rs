use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::{default_config_path, AppConfig};

pub struct LoadedConfig {
    pub config: AppConfig,
    /// Set when a file actually contributed.
    pub path: Option<PathBuf>,
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config = AppConfig::load(config_path.map(PathBuf::as_path)).with_context(|| match config_path {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "loading configuration".to_string(),
    })?;
    let path = config_path
        .cloned()
        .or_else(|| default_config_path().filter(|path| path.exists()));
    Ok(LoadedConfig { config, path })
}

/// Cancel `token` on the first Ctrl-C. Sessions notice at their next pause
/// and still close their browsers.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            token.cancel();
        }
    });
}
