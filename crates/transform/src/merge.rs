use std::collections::{BTreeMap, HashMap};

use crate::{context::RunContext, mapping::Series, sheet::DatasetTable};

/// Outer join of all datasets on month, ascending.
#[derive(Clone, Debug, Default)]
pub struct MergedTable {
    pub series: Vec<Series>,
    pub rows: BTreeMap<String, HashMap<String, f64>>,
}

impl MergedTable {
    pub fn value(&self, month: &str, code: &str) -> Option<f64> {
        self.rows.get(month)?.get(code).copied()
    }
}

/// Merge `tables` in order. Column order is the run context's first-seen
/// order; months past the context's cutoff are dropped.
pub fn merge(tables: &[DatasetTable], ctx: &mut RunContext) -> MergedTable {
    let mut rows: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    for table in tables {
        for series in &table.series {
            ctx.register(series);
        }
        for (month, values) in &table.rows {
            if !ctx.includes(month) {
                continue;
            }
            let row = rows.entry(month.clone()).or_default();
            for (series, value) in table.series.iter().zip(values) {
                if let Some(value) = value {
                    row.entry(series.code.clone()).or_insert(*value);
                }
            }
        }
    }
    MergedTable {
        series: ctx.series().to_vec(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(dataset: &str, prefix: &str, rows: &[(&str, Option<f64>)]) -> DatasetTable {
        DatasetTable {
            dataset: dataset.into(),
            series: vec![Series::new(dataset, prefix, "주식", Some("금액"))],
            rows: rows
                .iter()
                .map(|(month, value)| (month.to_string(), vec![*value]))
                .collect(),
        }
    }

    #[test]
    fn test_outer_join_on_month() {
        let mut ctx = RunContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let merged = merge(
            &[
                table("Equity", "EQUITY", &[("2024-02", Some(2.0)), ("2024-01", Some(1.0))]),
                table("Bond", "BOND", &[("2024-03", Some(3.0)), ("2024-01", None)]),
            ],
            &mut ctx,
        );
        let months: Vec<&str> = merged.rows.keys().map(String::as_str).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(merged.value("2024-01", "KMFK.EQUITY.STOCK.AMOUNT.M"), Some(1.0));
        assert_eq!(merged.value("2024-01", "KMFK.BOND.STOCK.AMOUNT.M"), None);
        assert_eq!(merged.value("2024-03", "KMFK.BOND.STOCK.AMOUNT.M"), Some(3.0));
        assert_eq!(merged.series[0].code, "KMFK.EQUITY.STOCK.AMOUNT.M");
    }

    #[test]
    fn test_cutoff_drops_later_months() {
        let mut ctx = RunContext::fixed();
        let merged = merge(
            &[table("Equity", "EQUITY", &[("2025-03", Some(1.0)), ("2025-04", Some(2.0))])],
            &mut ctx,
        );
        assert_eq!(merged.rows.len(), 1);
        assert!(merged.rows.contains_key("2025-03"));
    }
}
