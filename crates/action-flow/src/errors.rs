//! Navigation error types

use thiserror::Error;

use crate::types::NavState;

#[derive(Debug, Error)]
pub enum NavigationError {
    /// A transition could not be completed; the session is unusable.
    #[error("navigation step {step} failed: {reason}")]
    StepFailed { step: NavState, reason: String },

    #[error("invalid navigation flow: {0}")]
    InvalidFlow(String),

    #[error("navigation cancelled")]
    Cancelled,
}

impl NavigationError {
    pub fn step_failed(step: NavState, reason: impl ToString) -> Self {
        NavigationError::StepFailed {
            step,
            reason: reason.to_string(),
        }
    }

    /// A fresh session may get further.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NavigationError::StepFailed { .. })
    }

    /// 0=low .. 3=critical
    pub fn severity(&self) -> u8 {
        match self {
            NavigationError::StepFailed { .. } => 2,
            NavigationError::InvalidFlow(_) => 3,
            NavigationError::Cancelled => 0,
        }
    }
}
