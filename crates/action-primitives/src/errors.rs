//! Error types for action primitives

use cdp_adapter::DriverError;
use thiserror::Error;

/// Errors raised by the primitive operations
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Underlying driver failure
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Operation was cancelled or interrupted
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Every click strategy failed to deliver
    #[error("Element not clickable: {0}")]
    NotClickable(String),

    /// Interaction executed but the post-state did not match
    #[error("Verification failed for {what}: expected {expected:?}, found {actual:?}")]
    VerificationFailed {
        what: String,
        expected: String,
        actual: String,
    },

    /// Expected frame could not be re-entered
    #[error("Frame context lost: {0}")]
    ContextLost(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn verification(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ActionError::VerificationFailed {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::Driver(err) => err.retriable,
            ActionError::WaitTimeout(_)
            | ActionError::NotClickable(_)
            | ActionError::VerificationFailed { .. }
            | ActionError::ContextLost(_) => true,
            ActionError::Interrupted(_) | ActionError::Internal(_) => false,
        }
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::Driver(err) if err.is_fatal() => 3,
            ActionError::Driver(_) | ActionError::ContextLost(_) => 2,
            ActionError::WaitTimeout(_) | ActionError::VerificationFailed { .. } => 1,
            _ => 0,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ActionError::Interrupted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::DriverErrorKind;

    #[test]
    fn test_driver_errors_keep_their_retry_flag() {
        let stale: ActionError = DriverError::new(DriverErrorKind::StaleElement).into();
        assert!(stale.is_retryable());
        let closed: ActionError = DriverError::new(DriverErrorKind::Closed).into();
        assert!(!closed.is_retryable());
        assert_eq!(closed.severity(), 3);
    }

    #[test]
    fn test_verification_message() {
        let err = ActionError::verification("dropdown", "채권형", "주식형");
        assert_eq!(
            err.to_string(),
            "Verification failed for dropdown: expected \"채권형\", found \"주식형\""
        );
        assert!(err.is_retryable());
    }
}
