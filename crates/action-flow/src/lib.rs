//! Navigation sequencing
//!
//! Walks the portal from its entry page to the query form: load, enter the
//! content frame, then click through menu steps with a mandatory settle
//! interval after each one.

pub mod errors;
pub mod executor;
pub mod types;

pub use errors::NavigationError;
pub use executor::NavigationSequencer;
pub use types::{ExpectLandmark, NavState, NavStep, NavigationFlow, NavigationReport, StepResult};
