//! Session orchestration
//!
//! An [`AcquisitionSession`] owns one browser: it navigates once and then
//! acquires its datasets strictly one after another. The [`Orchestrator`]
//! runs a single session over the whole catalog, or splits the catalog into
//! contiguous batches for concurrent sessions and retries first-pass
//! failures on a session that is still healthy.

pub mod error;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod session;

pub use error::SchedulerError;
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use model::{partition, OrchestratorConfig, Pass, SessionContext};
pub use orchestrator::Orchestrator;
pub use session::{AcquisitionSession, SessionFactory};
