//! Error types for locator system

use action_primitives::ActionError;
use cdp_adapter::DriverError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every locator in the set failed on every attempt
    #[error("Element not found: {target} after {attempts} attempt(s)")]
    ElementNotFound { target: String, attempts: u32 },

    /// Driver failure that no retry can fix
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Run cancelled while resolving
    #[error("Resolution interrupted: {0}")]
    Interrupted(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    pub fn not_found(target: impl Into<String>, attempts: u32) -> Self {
        LocatorError::ElementNotFound {
            target: target.into(),
            attempts,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::ElementNotFound { .. } => true,
            LocatorError::Driver(err) => err.retriable,
            _ => false,
        }
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Driver(_) => 2,
            LocatorError::ElementNotFound { .. } => 1,
            LocatorError::Interrupted(_) => 0,
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::Driver(err) => ActionError::Driver(err),
            LocatorError::Interrupted(msg) => ActionError::Interrupted(msg),
            other => ActionError::WaitTimeout(other.to_string()),
        }
    }
}

impl From<ActionError> for LocatorError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Driver(err) => LocatorError::Driver(err),
            ActionError::Interrupted(msg) => LocatorError::Interrupted(msg),
            other => LocatorError::Internal(other.to_string()),
        }
    }
}
