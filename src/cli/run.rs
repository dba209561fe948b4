use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};
use crate::browser::ChromiumSessionFactory;
use crate::pipeline::{self, RunOptions, RunSummary};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Date the package 2025-03-31 and drop later months
    #[arg(long)]
    pub fixed_date: bool,

    /// Show the browser windows
    #[arg(long)]
    pub visible: bool,

    /// Parallel browser sessions (1 runs sequentially)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=11))]
    pub sessions: Option<u16>,

    /// Stop after acquisition
    #[arg(long)]
    pub skip_transform: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if args.visible {
        config.browser.headless = false;
    }
    let config = Arc::new(config);
    let factory = Arc::new(ChromiumSessionFactory::new(Arc::clone(&config)));
    let options = RunOptions {
        sessions: args.sessions.map(usize::from),
        fixed_date: args.fixed_date,
        skip_transform: args.skip_transform,
    };

    let summary = pipeline::run(config, factory, options, ctx.cancel_token()).await?;
    print_summary(&summary, ctx.output())?;
    if !summary.is_success() {
        bail!(
            "{} datasets failed: {}",
            summary.tally.finally_failed().len(),
            summary.tally.finally_failed().join(", ")
        );
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    let succeeded = summary.tally.succeeded();
    let failed = summary.tally.finally_failed();
    let recovered: Vec<String> = summary
        .tally
        .first_pass_failures()
        .into_iter()
        .filter(|name| !failed.contains(name))
        .collect();
    let structured = json!({
        "succeeded": succeeded,
        "failed": failed,
        "recovered": recovered,
        "attempts": summary.metrics.attempts,
        "sessions_opened": summary.metrics.sessions_opened,
        "sessions_lost": summary.metrics.sessions_lost,
        "elapsed_secs": summary.elapsed.as_secs(),
        "package": summary.transform.as_ref().map(|report| json!({
            "data": report.bundle.data,
            "meta": report.bundle.meta,
            "archive": report.bundle.archive,
            "series": report.series,
            "months": report.months,
        })),
    });
    if print_structured(format, &structured)? {
        return Ok(());
    }

    let elapsed = humantime::format_duration(Duration::from_secs(summary.elapsed.as_secs()));
    println!("Run finished in {elapsed}");
    println!("Succeeded ({}): {}", succeeded.len(), succeeded.join(", "));
    if !recovered.is_empty() {
        println!("Recovered by retry ({}): {}", recovered.len(), recovered.join(", "));
    }
    if failed.is_empty() {
        println!("Failed: none");
    } else {
        println!("Failed ({}): {}", failed.len(), failed.join(", "));
    }
    match &summary.transform {
        Some(report) => {
            println!(
                "Package: {} ({} series, {} months)",
                report.bundle.archive.display(),
                report.series,
                report.months
            );
            if !report.skipped.is_empty() {
                println!("Missing exports: {}", report.skipped.join(", "));
            }
        }
        None => println!("Package: not built"),
    }
    Ok(())
}
