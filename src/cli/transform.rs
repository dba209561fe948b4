use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::output::print_structured;
use crate::pipeline::run_transform;

#[derive(Args, Clone, Debug)]
pub struct TransformArgs {
    /// Date the package 2025-03-31 and drop later months
    #[arg(long)]
    pub fixed_date: bool,
}

pub async fn cmd_transform(args: TransformArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.shared_config();
    let report = tokio::task::spawn_blocking(move || run_transform(&config, args.fixed_date))
        .await
        .context("transform task failed")??;

    let structured = json!({
        "processed": report.processed,
        "skipped": report.skipped,
        "series": report.series,
        "months": report.months,
        "data": report.bundle.data,
        "meta": report.bundle.meta,
        "archive": report.bundle.archive,
    });
    if print_structured(ctx.output(), &structured)? {
        return Ok(());
    }

    println!("Processed ({}): {}", report.processed.len(), report.processed.join(", "));
    if !report.skipped.is_empty() {
        println!("Missing exports: {}", report.skipped.join(", "));
    }
    println!("Series: {}, months: {}", report.series, report.months);
    println!("Data: {}", report.bundle.data.display());
    println!("Metadata: {}", report.bundle.meta.display());
    println!("Archive: {}", report.bundle.archive.display());
    Ok(())
}
