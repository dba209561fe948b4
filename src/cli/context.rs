use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::output::OutputFormat;
use crate::config::AppConfig;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: Option<PathBuf>,
    output: OutputFormat,
    cancel: CancellationToken,
}

impl CliContext {
    pub fn new(
        config: AppConfig,
        config_path: Option<PathBuf>,
        output: OutputFormat,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            cancel,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn shared_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// File the configuration was read from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
