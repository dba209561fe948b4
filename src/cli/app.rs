use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{cancel_on_interrupt, load_config, LoadedConfig};
use crate::logging::init_logging;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let LoadedConfig { config, path } = load_config(cli.config.as_ref())?;
    let _log_guard = init_logging(&cli.log_level, cli.debug, cli.log_format, &config.paths.log_dir)?;

    info!("Starting kofia-fundstat v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &path {
        info!("Loaded configuration from: {}", path.display());
    }

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    let cli_context = CliContext::new(config, path, cli.output, cancel);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
