//! DATA / METADATA csv files and the zip bundle.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::info;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{context::RunContext, errors::TransformError, merge::MergedTable};

pub const MISSING: &str = "N.A.";
pub const FREQUENCY: &str = "Monthly";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputBundle {
    pub data: PathBuf,
    pub meta: PathBuf,
    pub archive: PathBuf,
}

/// Write `KMFK_DATA_{stamp}.csv`, `KMFK_META_{stamp}.csv` and
/// `KMFK_{stamp}.ZIP` into `dir`.
pub fn write_package(
    table: &MergedTable,
    ctx: &RunContext,
    dir: &Path,
) -> Result<OutputBundle, TransformError> {
    std::fs::create_dir_all(dir)?;
    let stamp = ctx.stamp();
    let bundle = OutputBundle {
        data: dir.join(format!("KMFK_DATA_{stamp}.csv")),
        meta: dir.join(format!("KMFK_META_{stamp}.csv")),
        archive: dir.join(format!("KMFK_{stamp}.ZIP")),
    };
    write_data(&bundle.data, table)?;
    write_meta(&bundle.meta, table, ctx)?;
    write_archive(&bundle.archive, &[&bundle.data, &bundle.meta])?;
    info!(
        target: "transform",
        data = %bundle.data.display(),
        archive = %bundle.archive.display(),
        series = table.series.len(),
        months = table.rows.len(),
        "package written"
    );
    Ok(bundle)
}

/// CODE row, DESCRIPTION row, then one row per month.
fn write_data(path: &Path, table: &MergedTable) -> Result<(), TransformError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut codes = vec!["Date".to_string()];
    codes.extend(table.series.iter().map(|s| s.code.clone()));
    writer.write_record(&codes)?;
    let mut descriptions = vec![String::new()];
    descriptions.extend(table.series.iter().map(|s| s.description.clone()));
    writer.write_record(&descriptions)?;

    for (month, values) in &table.rows {
        let mut record = vec![month.clone()];
        record.extend(table.series.iter().map(|series| {
            values
                .get(&series.code)
                .map_or_else(|| MISSING.to_string(), |value| value.to_string())
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_meta(path: &Path, table: &MergedTable, ctx: &RunContext) -> Result<(), TransformError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["CODE", "DESCRIPTION", "FREQUENCY", "UNIT", "NEXT_RELEASE_DATE"])?;
    let release = ctx.next_release_date();
    for series in &table.series {
        writer.write_record([
            series.code.as_str(),
            series.description.as_str(),
            FREQUENCY,
            series.unit,
            release.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_archive(path: &Path, entries: &[&PathBuf]) -> Result<(), TransformError> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        let name = entry
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        zip.write_all(&std::fs::read(entry)?)?;
    }
    zip.finish()?;
    Ok(())
}
