use super::config::cmd_config;
use super::datasets::cmd_datasets;
use super::env::CliArgs;
use super::info::cmd_info;
use super::run::cmd_run;
use super::transform::cmd_transform;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Transform(args) => cmd_transform(args, ctx).await,
        Commands::Datasets => cmd_datasets(ctx),
        Commands::Config(args) => cmd_config(args, ctx),
        Commands::Info => cmd_info(ctx),
    }
}
