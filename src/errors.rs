//! Errors raised while assembling a run from configuration.

use std::path::PathBuf;

use fundstat_core_types::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("configuration file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("invalid dataset catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("invalid configuration value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// Configuration problems are fixed by the operator, never by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Io(_))
    }
}
