use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("no visible '{label}' radio in group {group}")]
    OptionNotFound {
        group: String,
        label: String,
        #[source]
        source: LocatorError,
    },
    #[error("'{label}' in group {group} did not become checked")]
    Unverified { group: String, label: String },
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("operation cancelled")]
    Cancelled,
}

impl RadioError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RadioError::Cancelled => false,
            RadioError::Action(err) => err.is_retryable(),
            RadioError::OptionNotFound { source, .. } => source.is_retryable(),
            RadioError::Unverified { .. } => true,
        }
    }

    /// 0=low .. 3=critical
    pub fn severity(&self) -> u8 {
        match self {
            RadioError::Action(err) => err.severity(),
            RadioError::OptionNotFound { source, .. } => source.severity(),
            RadioError::Unverified { .. } => 1,
            RadioError::Cancelled => 0,
        }
    }
}

impl From<cdp_adapter::DriverError> for RadioError {
    fn from(err: cdp_adapter::DriverError) -> Self {
        RadioError::Action(ActionError::Driver(err))
    }
}
