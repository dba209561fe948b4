//! Korean header labels to series codes.

/// Category header (level 0) to its English name.
pub fn category_name(korean: &str) -> Option<&'static str> {
    let name = match korean {
        "자산총액" => "TotalAsset",
        "주식" => "Stock",
        "채권" => "Bonds",
        "CP" => "CP",
        "어음" => "Notes",
        "집합투자증권" => "CollectiveInvestmentSecurities",
        "파생상품" => "Derivatives",
        "부동산" => "RealEstate",
        "특별자산" => "SpecialAssets",
        "단기대출및예금" | "예금" => "Deposit",
        "콜론" => "CallLoan",
        "기타" => "Other",
        _ => return None,
    };
    Some(name)
}

/// Metric header (level 1) to its English name.
pub fn metric_name(korean: &str) -> Option<&'static str> {
    match korean {
        "금액" => Some("Amount"),
        "비중" => Some("Weight"),
        _ => None,
    }
}

/// One output column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub code: String,
    pub description: String,
    pub unit: &'static str,
}

impl Series {
    /// `KMFK.{PREFIX}.{CATEGORY}[.{METRIC}].M`; unknown labels pass through.
    pub fn new(dataset: &str, prefix: &str, category: &str, metric: Option<&str>) -> Self {
        let category = category_name(category).unwrap_or(category);
        match metric {
            Some(metric) => {
                let metric = metric_name(metric).unwrap_or(metric);
                Self {
                    code: format!(
                        "KMFK.{prefix}.{}.{}.M",
                        category.to_uppercase(),
                        metric.to_uppercase()
                    ),
                    description: format!("{dataset}: {category}: {metric}"),
                    unit: if metric == "Weight" { "Percentage" } else { "KRW Million" },
                }
            }
            None => Self {
                code: format!("KMFK.{prefix}.{}.M", category.to_uppercase()),
                description: format!("{dataset}: {category}"),
                unit: "KRW Million",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_with_metric() {
        let series = Series::new("Equity", "EQUITY", "주식", Some("비중"));
        assert_eq!(series.code, "KMFK.EQUITY.STOCK.WEIGHT.M");
        assert_eq!(series.description, "Equity: Stock: Weight");
        assert_eq!(series.unit, "Percentage");
    }

    #[test]
    fn test_series_without_metric() {
        let series = Series::new("Bond", "BOND", "자산총액", None);
        assert_eq!(series.code, "KMFK.BOND.TOTALASSET.M");
        assert_eq!(series.description, "Bond: TotalAsset");
        assert_eq!(series.unit, "KRW Million");
    }

    #[test]
    fn test_deposit_aliases() {
        assert_eq!(category_name("예금"), category_name("단기대출및예금"));
        assert_eq!(category_name("없음"), None);
    }

    #[test]
    fn test_unknown_labels_pass_through() {
        let series = Series::new("Bond", "BOND", "신규", Some("수익률"));
        assert_eq!(series.code, "KMFK.BOND.신규.수익률.M");
    }
}
