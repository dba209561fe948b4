//! Dataset acquisition
//!
//! Fills the query form for one dataset, triggers the export, waits for the
//! browser to finish writing the file and moves it to its dataset-scoped
//! name. Failures inside an attempt never cross the dataset boundary: they
//! drive a bounded retry and end in a [`DatasetOutcome`].
//!
//! [`DatasetOutcome`]: fundstat_core_types::DatasetOutcome

pub mod controller;
pub mod detector;
pub mod errors;
pub mod site;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use controller::{AcquireReport, AcquireSettings, AcquisitionController};
pub use detector::{Baseline, DetectorSettings, DownloadDetector};
pub use errors::AcquireError;
pub use site::{NavPacing, SiteProfile};
