use std::io;

use action_flow::NavigationError;
use action_primitives::ActionError;
use thiserror::Error;
use tool_click::ClickError;
use tool_radio_group::RadioError;
use tool_select_option::DropdownError;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("{field}: {source}")]
    Dropdown {
        field: &'static str,
        #[source]
        source: DropdownError,
    },

    #[error("{field}: {source}")]
    Radio {
        field: &'static str,
        #[source]
        source: RadioError,
    },

    /// Search or export trigger; carries `ActionButtonNotFound`.
    #[error("{button}: {source}")]
    Click {
        button: &'static str,
        #[source]
        source: ClickError,
    },

    #[error("no finished download after {waited_ms}ms")]
    DownloadTimeout { waited_ms: u64 },

    #[error("download directory: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Action(ActionError),

    #[error("acquisition cancelled")]
    Cancelled,
}

impl From<ActionError> for AcquireError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Interrupted(_) => AcquireError::Cancelled,
            other => AcquireError::Action(other),
        }
    }
}

impl AcquireError {
    pub fn dropdown(field: &'static str, source: DropdownError) -> Self {
        match source {
            DropdownError::Cancelled => AcquireError::Cancelled,
            DropdownError::Action(ActionError::Interrupted(_)) => AcquireError::Cancelled,
            source => AcquireError::Dropdown { field, source },
        }
    }

    pub fn radio(field: &'static str, source: RadioError) -> Self {
        match source {
            RadioError::Cancelled => AcquireError::Cancelled,
            RadioError::Action(ActionError::Interrupted(_)) => AcquireError::Cancelled,
            source => AcquireError::Radio { field, source },
        }
    }

    pub fn click(button: &'static str, source: ClickError) -> Self {
        match source {
            ClickError::Cancelled => AcquireError::Cancelled,
            ClickError::Action(ActionError::Interrupted(_)) => AcquireError::Cancelled,
            source => AcquireError::Click { button, source },
        }
    }

    /// Whether another attempt of the same dataset can help.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquireError::Cancelled => false,
            _ => !self.is_fatal(),
        }
    }

    /// The session's browser is gone; nothing more can run on it.
    pub fn is_fatal(&self) -> bool {
        let driver = match self {
            AcquireError::Action(ActionError::Driver(err)) => Some(err),
            AcquireError::Dropdown {
                source: DropdownError::Action(ActionError::Driver(err)),
                ..
            } => Some(err),
            AcquireError::Radio {
                source: RadioError::Action(ActionError::Driver(err)),
                ..
            } => Some(err),
            AcquireError::Click {
                source: ClickError::Action(ActionError::Driver(err)),
                ..
            } => Some(err),
            _ => None,
        };
        driver.is_some_and(|err| err.is_fatal())
    }

    /// 0=low .. 3=critical
    pub fn severity(&self) -> u8 {
        match self {
            AcquireError::Navigation(err) => err.severity(),
            AcquireError::Dropdown { source, .. } => source.severity(),
            AcquireError::Radio { source, .. } => source.severity(),
            AcquireError::Click { source, .. } => source.severity(),
            AcquireError::DownloadTimeout { .. } => 2,
            AcquireError::Io(_) => 2,
            AcquireError::Action(err) => err.severity(),
            AcquireError::Cancelled => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::{DriverError, DriverErrorKind};

    #[test]
    fn test_closed_browser_is_fatal() {
        let err = AcquireError::click(
            "export_button",
            ClickError::Action(ActionError::Driver(DriverError::new(DriverErrorKind::Closed))),
        );
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_download_timeout_is_retryable() {
        let err = AcquireError::DownloadTimeout { waited_ms: 10 };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), 2);
    }

    #[test]
    fn test_cancelled_widgets_collapse_to_cancelled() {
        let err = AcquireError::dropdown("period", DropdownError::Cancelled);
        assert!(matches!(err, AcquireError::Cancelled));
    }
}
