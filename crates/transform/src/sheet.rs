//! Exported workbook to a per-dataset table.

use std::{collections::BTreeMap, io::Cursor, path::Path};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::{errors::TransformError, mapping::Series};

/// Zero-based rows holding the two header levels.
pub const CATEGORY_ROW: usize = 2;
pub const METRIC_ROW: usize = 3;

/// Monthly values of one dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetTable {
    pub dataset: String,
    pub series: Vec<Series>,
    /// `YYYY-MM` to one value per entry of `series`.
    pub rows: BTreeMap<String, Vec<Option<f64>>>,
}

/// Read the first worksheet as an absolute grid (row 0 is the sheet's first
/// row even when the used range starts lower). The format is sniffed from
/// the content: the portal serves OOXML under an `.xls` name.
pub fn read_grid(path: &Path) -> Result<Vec<Vec<Data>>, TransformError> {
    let bytes = std::fs::read(path)?;
    let workbook_error = |source| TransformError::Workbook {
        file: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(workbook_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TransformError::NoWorksheet(path.to_path_buf()))?
        .map_err(workbook_error)?;

    let (top, left) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let mut grid = vec![Vec::new(); top];
    for row in range.rows() {
        let mut cells = vec![Data::Empty; left];
        cells.extend_from_slice(row);
        grid.push(cells);
    }
    Ok(grid)
}

/// Map the two header levels to series and collect the data rows.
///
/// Level-0 labels carry over to the right (merged cells). The date column
/// is the first one whose headers are blank or mention 기준일.
pub fn parse_grid(
    dataset: &str,
    prefix: &str,
    grid: &[Vec<Data>],
    file: &Path,
) -> Result<DatasetTable, TransformError> {
    let header = |row: usize| {
        grid.get(row).ok_or_else(|| TransformError::MissingHeader {
            file: file.to_path_buf(),
            row: row + 1,
        })
    };
    let level0 = header(CATEGORY_ROW)?;
    let level1 = header(METRIC_ROW)?;
    let width = level0.len().max(level1.len());

    let mut date_col = None;
    let mut carried: Option<String> = None;
    let mut columns: Vec<(usize, Series)> = Vec::new();
    for col in 0..width {
        let top = cell_text(level0.get(col));
        let sub = cell_text(level1.get(col));
        if top.contains("기준일") || (top.is_empty() && sub.is_empty()) {
            date_col.get_or_insert(col);
            continue;
        }
        let category = if top.is_empty() {
            match &carried {
                Some(category) => category.clone(),
                None => continue,
            }
        } else {
            carried = Some(top.clone());
            top
        };
        let metric = (!sub.is_empty()).then_some(sub);
        let series = Series::new(dataset, prefix, &category, metric.as_deref());
        if columns.iter().any(|(_, known)| known.code == series.code) {
            warn!(target: "transform", dataset, code = %series.code, "duplicate column ignored");
            continue;
        }
        columns.push((col, series));
    }
    let date_col = date_col.ok_or_else(|| TransformError::NoDateColumn(file.to_path_buf()))?;

    let mut rows = BTreeMap::new();
    for (index, row) in grid.iter().enumerate().skip(METRIC_ROW + 1) {
        let Some(month) = month_of(row.get(date_col)) else {
            debug!(target: "transform", dataset, row = index + 1, "row without date skipped");
            continue;
        };
        let values = columns.iter().map(|(col, _)| number(row.get(*col))).collect();
        rows.insert(month, values);
    }

    Ok(DatasetTable {
        dataset: dataset.to_string(),
        series: columns.into_iter().map(|(_, series)| series).collect(),
        rows,
    })
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// `YYYY-MM` of a date cell.
pub fn month_of(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::DateTime(value) => value.as_datetime().map(|dt| dt.format("%Y-%m").to_string()),
        Data::String(text) | Data::DateTimeIso(text) => month_from_text(text),
        Data::Float(value) => month_from_number(*value),
        Data::Int(value) => month_from_number(*value as f64),
        _ => None,
    }
}

/// Accepts `2024-01-31`, `2024.01`, `2024/1`, `202401` and `20240131`.
fn month_from_text(text: &str) -> Option<String> {
    let parts: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .collect();
    let (year, month) = match parts.as_slice() {
        [compact, ..] if compact.len() == 6 || compact.len() == 8 => {
            (compact[..4].parse().ok()?, compact[4..6].parse().ok()?)
        }
        [year, month, ..] if year.len() == 4 => (year.parse().ok()?, month.parse().ok()?),
        _ => return None,
    };
    format_month(year, month)
}

/// `yyyymm` / `yyyymmdd` numbers, otherwise an Excel serial day.
fn month_from_number(value: f64) -> Option<String> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    if value.fract() == 0.0 {
        let digits = format!("{}", value as u64);
        if digits.len() == 6 || digits.len() == 8 {
            return month_from_text(&digits);
        }
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(value.trunc() as i64))?;
    Some(date.format("%Y-%m").to_string())
}

fn format_month(year: u32, month: u32) -> Option<String> {
    ((1900..=2999).contains(&year) && (1..=12).contains(&month))
        .then(|| format!("{year:04}-{month:02}"))
}

/// Numeric value of a cell; thousands separators are dropped and anything
/// unparsable is missing.
pub fn number(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(value) if value.is_finite() => Some(*value),
        Data::Int(value) => Some(*value as f64),
        Data::String(text) => text.trim().replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn grid() -> Vec<Vec<Data>> {
        vec![
            vec![s("투자자산별비중 추이")],
            vec![],
            vec![s("기준일자"), s("자산총액"), s("주식"), Data::Empty, s("채권"), Data::Empty],
            vec![Data::Empty, Data::Empty, s("금액"), s("비중"), s("금액"), s("비중")],
            vec![s("2024-02-29"), s("1,200"), s("800"), Data::Float(66.7), s("-"), s("0")],
            vec![s("2024-01-31"), Data::Float(1100.0), Data::Int(700), s("63.6"), s("400"), s("36.4")],
            vec![Data::Empty, s("합계")],
        ]
    }

    #[test]
    fn test_parse_grid_maps_headers() {
        let table = parse_grid("Equity", "EQUITY", &grid(), Path::new("Equity.xls")).unwrap();
        let codes: Vec<&str> = table.series.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "KMFK.EQUITY.TOTALASSET.M",
                "KMFK.EQUITY.STOCK.AMOUNT.M",
                "KMFK.EQUITY.STOCK.WEIGHT.M",
                "KMFK.EQUITY.BONDS.AMOUNT.M",
                "KMFK.EQUITY.BONDS.WEIGHT.M",
            ]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows["2024-02"],
            vec![Some(1200.0), Some(800.0), Some(66.7), None, Some(0.0)]
        );
        assert_eq!(table.rows.keys().next().map(String::as_str), Some("2024-01"));
    }

    #[test]
    fn test_missing_header_rows() {
        let err = parse_grid("Bond", "BOND", &grid()[..3], Path::new("Bond.xls")).unwrap_err();
        assert!(matches!(err, TransformError::MissingHeader { row: 4, .. }));
    }

    #[test]
    fn test_month_formats() {
        assert_eq!(month_from_text("2024.01"), Some("2024-01".into()));
        assert_eq!(month_from_text("2024/1/5"), Some("2024-01".into()));
        assert_eq!(month_from_text("20231231"), Some("2023-12".into()));
        assert_eq!(month_from_text("합계"), None);
        assert_eq!(month_from_number(202403.0), Some("2024-03".into()));
        assert_eq!(month_from_number(45322.0), Some("2024-01".into()));
    }

    #[test]
    fn test_number_cleanup() {
        assert_eq!(number(Some(&s(" 12,345.5 "))), Some(12345.5));
        assert_eq!(number(Some(&s("N/A"))), None);
        assert_eq!(number(Some(&Data::Empty)), None);
    }
}
