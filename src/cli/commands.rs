use clap::Subcommand;

use super::config::ConfigArgs;
use super::run::RunArgs;
use super::transform::TransformArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Acquire every dataset from the portal, then build the package
    Run(RunArgs),

    /// Build the package from exports already in the download directory
    Transform(TransformArgs),

    /// List the effective dataset catalog
    Datasets,

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// Show build information and the detected browser
    Info,
}
