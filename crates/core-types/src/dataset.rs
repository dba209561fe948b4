use std::collections::HashSet;

use thiserror::Error;

/// Length of the query period requested from the portal.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeWindow {
    Years(u32),
    Months(u32),
}

impl TimeWindow {
    pub fn months(&self) -> u32 {
        match self {
            TimeWindow::Years(years) => years.saturating_mul(12),
            TimeWindow::Months(months) => *months,
        }
    }

    /// Option text shown by the period dropdown (`5년`, `6개월`).
    pub fn period_label(&self) -> String {
        let months = self.months();
        if months >= 12 && months % 12 == 0 {
            format!("{}년", months / 12)
        } else {
            format!("{}개월", months)
        }
    }
}

/// One dataset to retrieve: a fund-type x region combination.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetConfig {
    pub name: String,
    /// Human-readable fund type.
    pub fund_type: String,
    /// Option text selected in the fund-type control.
    pub fund_type_key: String,
    pub region: String,
    /// Radio label selected in the region group.
    pub region_key: String,
    /// Option text selected in the fund-category control.
    pub fund_universe_key: String,
    pub window: TimeWindow,
    /// File stem of the renamed export; unique across the catalog.
    pub output_name: String,
    /// Series code prefix used by the transform stage.
    pub code_prefix: String,
}

impl DatasetConfig {
    pub fn file_name(&self) -> String {
        format!("{}.xls", self.output_name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("dataset catalog is empty")]
    Empty,
    #[error("duplicate output name '{0}'")]
    DuplicateOutput(String),
    #[error("duplicate dataset name '{0}'")]
    DuplicateName(String),
    #[error("dataset '{0}' has an empty output name")]
    EmptyOutput(String),
}

/// Check the invariants the acquisition layer relies on.
pub fn validate_catalog(catalog: &[DatasetConfig]) -> Result<(), CatalogError> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut outputs = HashSet::new();
    let mut names = HashSet::new();
    for dataset in catalog {
        if dataset.output_name.trim().is_empty() {
            return Err(CatalogError::EmptyOutput(dataset.name.clone()));
        }
        if !outputs.insert(dataset.output_name.as_str()) {
            return Err(CatalogError::DuplicateOutput(dataset.output_name.clone()));
        }
        if !names.insert(dataset.name.as_str()) {
            return Err(CatalogError::DuplicateName(dataset.name.clone()));
        }
    }
    Ok(())
}

const ALL: &str = "전체";
const DOMESTIC: &str = "국내";

fn entry(
    name: &str,
    fund_type: &str,
    fund_type_key: &str,
    domestic: bool,
    output_name: &str,
    code_prefix: &str,
) -> DatasetConfig {
    DatasetConfig {
        name: name.to_string(),
        fund_type: fund_type.to_string(),
        fund_type_key: fund_type_key.to_string(),
        region: if domestic { "Domestic" } else { "All" }.to_string(),
        region_key: if domestic { DOMESTIC } else { ALL }.to_string(),
        fund_universe_key: ALL.to_string(),
        window: TimeWindow::Years(5),
        output_name: output_name.to_string(),
        code_prefix: code_prefix.to_string(),
    }
}

/// The eleven datasets published as the KMFK package.
pub fn builtin_catalog() -> Vec<DatasetConfig> {
    vec![
        entry("RawDataEquity", "Equity Funds", "주식형", false, "Equity", "EQUITY"),
        entry(
            "RawDataDomesticEquity",
            "Equity Funds",
            "주식형",
            true,
            "DomesticEquity",
            "DOMESTICEQUITY",
        ),
        entry(
            "RawDataHybridEquity",
            "Hybrid Equity",
            "혼합주식형",
            false,
            "HybridEquity",
            "HYBRIDEQUITY",
        ),
        entry(
            "RawDataHybridDomesticEquity",
            "Hybrid Equity",
            "혼합주식형",
            true,
            "HybridDomesticEquity",
            "HYBRIDDOMEQUITY",
        ),
        entry(
            "RawDataHybridBond",
            "Hybrid Bond",
            "혼합채권형",
            false,
            "HybridBond",
            "HYBRIDBOND",
        ),
        entry(
            "RawDataHybridDomesticBond",
            "Hybrid Bond",
            "혼합채권형",
            true,
            "HybridDomesticBond",
            "HYBRIDDOMBOND",
        ),
        entry("RawDataBond", "Bond", "채권형", false, "Bond", "BOND"),
        entry(
            "RawDataDomesticBond",
            "Bond",
            "채권형",
            true,
            "DomesticBond",
            "DOMBOND",
        ),
        entry(
            "RawDataHybridAsset",
            "Hybrid Asset",
            "혼합자산",
            false,
            "HybridAsset",
            "HYBRIDASSET",
        ),
        entry(
            "RawDataDomesticHybridAsset",
            "Hybrid Asset",
            "혼합자산",
            true,
            "DomesticHybridAsset",
            "DOMHYBRIDASSET",
        ),
        entry(
            "RawDataMoneyMarket",
            "Money Market",
            "단기금융",
            false,
            "MoneyMarket",
            "MONEYMARKET",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 11);
        validate_catalog(&catalog).unwrap();
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let mut catalog = builtin_catalog();
        catalog[1].output_name = catalog[0].output_name.clone();
        assert_eq!(
            validate_catalog(&catalog),
            Err(CatalogError::DuplicateOutput("Equity".into()))
        );
    }

    #[test]
    fn test_period_label() {
        assert_eq!(TimeWindow::Years(5).period_label(), "5년");
        assert_eq!(TimeWindow::Months(6).period_label(), "6개월");
        assert_eq!(TimeWindow::Months(24).period_label(), "2년");
        assert_eq!(TimeWindow::Months(18).period_label(), "18개월");
    }

    #[test]
    fn test_huge_year_window_saturates() {
        assert_eq!(TimeWindow::Years(u32::MAX).months(), u32::MAX);
        assert_eq!(TimeWindow::Years(3).months(), 36);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(builtin_catalog()[6].file_name(), "Bond.xls");
    }
}
