use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::CliContext;
use crate::config::default_config_path;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (defaults, file and environment merged)
    Show,

    /// Print where the configuration file is looked up
    Path,

    /// Validate the effective configuration
    Validate,
}

pub fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let rendered = serde_yaml::to_string(ctx.config()).context("rendering configuration")?;
            print!("{rendered}");
        }
        ConfigAction::Path => match ctx.config_path() {
            Some(path) => println!("{}", path.display()),
            None => match default_config_path() {
                Some(path) => println!("{} (not present, using defaults)", path.display()),
                None => println!("no configuration directory on this platform"),
            },
        },
        ConfigAction::Validate => {
            ctx.config().validate()?;
            println!(
                "Configuration is valid ({} datasets, {} session(s))",
                ctx.config().catalog().len(),
                ctx.config().sessions.count
            );
        }
    }
    Ok(())
}
