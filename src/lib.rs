//! KOFIA fund statistics collector
//!
//! Wires the acquisition crates into a runnable pipeline: configuration,
//! logging, Chromium-backed sessions and the command-line interface.

pub mod browser;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;

pub use config::AppConfig;
pub use errors::AppError;
pub use pipeline::{run_transform, RunOptions, RunSummary};
