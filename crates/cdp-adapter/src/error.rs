use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced by a driver.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriverErrorKind {
    #[error("navigation timed out")]
    NavTimeout,
    #[error("browser i/o failure")]
    Io,
    #[error("frame not found")]
    FrameNotFound,
    #[error("element is stale")]
    StaleElement,
    #[error("element not interactable")]
    NotInteractable,
    #[error("script failed")]
    Script,
    #[error("browser launch failed")]
    Launch,
    #[error("driver closed")]
    Closed,
    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

impl DriverError {
    pub fn new(kind: DriverErrorKind) -> Self {
        let retriable = matches!(
            kind,
            DriverErrorKind::StaleElement
                | DriverErrorKind::NotInteractable
                | DriverErrorKind::Io
                | DriverErrorKind::NavTimeout
        );
        Self {
            kind,
            hint: None,
            retriable,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    /// The browser behind the driver is gone; nothing at this session can recover.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, DriverErrorKind::Closed | DriverErrorKind::Launch)
    }
}
