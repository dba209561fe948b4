use action_flow::NavigationError;
use cdp_adapter::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("session {session}: browser launch failed: {source}")]
    Launch {
        session: usize,
        #[source]
        source: DriverError,
    },
    #[error("session {session}: {source}")]
    Navigation {
        session: usize,
        #[source]
        source: NavigationError,
    },
    #[error("staging directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("run cancelled")]
    Cancelled,
}

impl SchedulerError {
    pub fn navigation(session: usize, source: NavigationError) -> Self {
        match source {
            NavigationError::Cancelled => SchedulerError::Cancelled,
            source => SchedulerError::Navigation { session, source },
        }
    }

    /// Whether opening a fresh session could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            SchedulerError::Launch { source, .. } => !source.is_fatal(),
            SchedulerError::Navigation { source, .. } => source.is_retryable(),
            SchedulerError::Io(_) | SchedulerError::Metrics(_) | SchedulerError::Cancelled => false,
        }
    }
}
