//! Transform / merge stage
//!
//! Reads each `{output_name}.xls` export, maps its two Korean header levels
//! to `KMFK.*` series codes, outer-joins the datasets on month and writes the
//! DATA / METADATA csv files plus a zip bundle.

pub mod context;
pub mod errors;
pub mod mapping;
pub mod merge;
pub mod output;
pub mod sheet;

use std::path::Path;

use fundstat_core_types::DatasetConfig;
use tracing::{info, instrument, warn};

pub use context::RunContext;
pub use errors::TransformError;
pub use mapping::Series;
pub use merge::{merge, MergedTable};
pub use output::{write_package, OutputBundle};
pub use sheet::{parse_grid, read_grid, DatasetTable};

/// Output names in the order their series appear in the package.
pub const PROCESSING_ORDER: &[&str] = &[
    "Equity",
    "DomesticEquity",
    "HybridEquity",
    "HybridDomesticEquity",
    "HybridBond",
    "HybridDomesticBond",
    "Bond",
    "DomesticBond",
    "MoneyMarket",
    "HybridAsset",
    "DomesticHybridAsset",
];

#[derive(Clone, Debug)]
pub struct TransformReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub bundle: OutputBundle,
    pub series: usize,
    pub months: usize,
}

/// Catalog entries in processing order; entries not listed there follow in
/// catalog order.
pub fn processing_order(catalog: &[DatasetConfig]) -> Vec<&DatasetConfig> {
    let rank = |config: &DatasetConfig| {
        PROCESSING_ORDER
            .iter()
            .position(|name| *name == config.output_name)
            .unwrap_or(PROCESSING_ORDER.len())
    };
    let mut ordered: Vec<&DatasetConfig> = catalog.iter().collect();
    ordered.sort_by_key(|config| rank(config));
    ordered
}

/// Read every available export from `input_dir` and write the package into
/// `output_dir`. Missing exports are skipped; none at all is an error.
#[instrument(skip_all, fields(input = %input_dir.display(), run_date = %ctx.run_date()))]
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    catalog: &[DatasetConfig],
    ctx: &mut RunContext,
) -> Result<TransformReport, TransformError> {
    let mut tables = Vec::new();
    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    for config in processing_order(catalog) {
        let path = input_dir.join(config.file_name());
        if !path.exists() {
            warn!(target: "transform", file = %path.display(), "export not found, skipping");
            skipped.push(config.output_name.clone());
            continue;
        }
        let grid = read_grid(&path)?;
        let table = parse_grid(&config.output_name, &config.code_prefix, &grid, &path)?;
        info!(
            target: "transform",
            dataset = %config.output_name,
            series = table.series.len(),
            months = table.rows.len(),
            "export parsed"
        );
        processed.push(config.output_name.clone());
        tables.push(table);
    }
    if tables.is_empty() {
        return Err(TransformError::NoInput(input_dir.to_path_buf()));
    }

    let merged = merge(&tables, ctx);
    let bundle = write_package(&merged, ctx, output_dir)?;
    Ok(TransformReport {
        processed,
        skipped,
        bundle,
        series: merged.series.len(),
        months: merged.rows.len(),
    })
}
