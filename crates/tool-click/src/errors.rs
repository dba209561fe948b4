use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClickError {
    #[error("no visible match for action button {button}")]
    ActionButtonNotFound {
        button: String,
        #[source]
        source: LocatorError,
    },
    #[error("every click strategy failed on {0}")]
    Exhausted(String),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("operation cancelled")]
    Cancelled,
}

impl ClickError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ClickError::Cancelled => false,
            ClickError::Action(err) => err.is_retryable(),
            ClickError::ActionButtonNotFound { .. } | ClickError::Exhausted(_) => true,
        }
    }

    /// 0=low .. 3=critical
    pub fn severity(&self) -> u8 {
        match self {
            ClickError::Action(err) => err.severity(),
            ClickError::Cancelled => 0,
            _ => 2,
        }
    }
}

impl From<cdp_adapter::DriverError> for ClickError {
    fn from(err: cdp_adapter::DriverError) -> Self {
        ClickError::Action(ActionError::Driver(err))
    }
}
