use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DropdownError {
    #[error("dropdown control not found: {0}")]
    ControlNotFound(#[source] LocatorError),
    #[error("dropdown did not open: {0}")]
    OpenFailed(String),
    #[error("option list not found in frame or document root")]
    ListboxMissing,
    #[error("option '{option}' not found after {scrolls} scroll step(s)")]
    OptionNotFound { option: String, scrolls: u32 },
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("operation cancelled")]
    Cancelled,
}

impl DropdownError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DropdownError::Cancelled => false,
            DropdownError::Action(err) => !err.is_interrupted() && err.severity() < 3,
            DropdownError::ControlNotFound(err) => err.is_retryable(),
            _ => true,
        }
    }

    /// 0=low .. 3=critical
    pub fn severity(&self) -> u8 {
        match self {
            DropdownError::Action(err) => err.severity(),
            DropdownError::ControlNotFound(err) => err.severity(),
            DropdownError::Cancelled => 0,
            _ => 1,
        }
    }
}

impl From<cdp_adapter::DriverError> for DropdownError {
    fn from(err: cdp_adapter::DriverError) -> Self {
        DropdownError::Action(ActionError::Driver(err))
    }
}

impl From<LocatorError> for DropdownError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::Interrupted(_) => DropdownError::Cancelled,
            other => DropdownError::ControlNotFound(other),
        }
    }
}
