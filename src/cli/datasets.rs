use anyhow::Result;

use super::context::CliContext;
use super::output::print_structured;

pub fn cmd_datasets(ctx: &CliContext) -> Result<()> {
    let catalog = ctx.config().catalog();
    if print_structured(ctx.output(), &catalog)? {
        return Ok(());
    }

    println!(
        "{:<30} {:<12} {:<6} {:<6} {:<22} {}",
        "NAME", "FUND TYPE", "REGION", "PERIOD", "FILE", "PREFIX"
    );
    for dataset in &catalog {
        println!(
            "{:<30} {:<12} {:<6} {:<6} {:<22} {}",
            dataset.name,
            dataset.fund_type_key,
            dataset.region_key,
            dataset.window.period_label(),
            dataset.file_name(),
            dataset.code_prefix
        );
    }
    println!("{} datasets", catalog.len());
    Ok(())
}
