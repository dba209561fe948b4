//! Shared primitives for the fund statistics collector.
//!
//! Everything here is plain data: identifiers, the dataset catalog and the
//! records exchanged between the acquisition layers and the orchestrator.

use std::fmt;

use uuid::Uuid;

mod dataset;
mod record;

pub use dataset::{builtin_catalog, validate_catalog, CatalogError, DatasetConfig, TimeWindow};
pub use record::{DatasetOutcome, DownloadRecord, RunTally, SessionResult};

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Stable label for numbered sessions, e.g. `session-2`.
    pub fn numbered(index: usize) -> Self {
        Self(format!("session-{index}"))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one acquisition session.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionPhase {
    Initializing,
    Navigated,
    Acquiring { dataset: String },
    Idle,
    Closed,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Initializing => "initializing",
            SessionPhase::Navigated => "navigated",
            SessionPhase::Acquiring { .. } => "acquiring",
            SessionPhase::Idle => "idle",
            SessionPhase::Closed => "closed",
        }
    }

    /// Whether a session in this phase may start another dataset.
    pub fn accepts_work(&self) -> bool {
        matches!(self, SessionPhase::Navigated | SessionPhase::Idle)
    }
}
