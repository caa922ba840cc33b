//! Fundamental metrics and the per-metric series shown on the fundamentals page.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Metric charted when the user has not picked one.
pub const DEFAULT_METRIC: &str = "financials_Total Revenue";

const METRIC_PREFIXES: [&str; 3] = ["financials_", "balance_sheet_", "cashflow_"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamental {
    #[serde(default)]
    pub id: i64,
    pub company_id: i64,
    pub date: String,
    pub metric: String,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Fundamental {
    /// Missing and non-finite values read as zero.
    pub fn value_or_zero(&self) -> f64 {
        match self.value {
            Some(v) if v.is_finite() => v,
            _ => 0.0,
        }
    }
}

/// Distinct metric names, sorted.
pub fn metric_names(rows: &[Fundamental]) -> Vec<String> {
    rows.iter()
        .map(|f| f.metric.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows of one metric in ascending date order.
pub fn metric_series<'a>(rows: &'a [Fundamental], metric: &str) -> Vec<&'a Fundamental> {
    let mut series: Vec<&Fundamental> = rows.iter().filter(|f| f.metric == metric).collect();
    series.sort_by(|a, b| a.date.cmp(&b.date));
    series
}

/// The metric a view should open on: the requested one when the rows have
/// it, then [`DEFAULT_METRIC`], then the first name alphabetically.
pub fn select_metric(rows: &[Fundamental], requested: Option<&str>) -> Option<String> {
    let names = metric_names(rows);
    requested
        .map(str::trim)
        .filter(|r| names.iter().any(|n| n == *r))
        .or_else(|| names.iter().any(|n| n == DEFAULT_METRIC).then_some(DEFAULT_METRIC))
        .map(str::to_string)
        .or_else(|| names.into_iter().next())
}

/// Most recent row of every metric, ordered by metric name.
pub fn latest_values(rows: &[Fundamental]) -> Vec<&Fundamental> {
    let mut latest: BTreeMap<&str, &Fundamental> = BTreeMap::new();
    for row in rows {
        latest
            .entry(row.metric.as_str())
            .and_modify(|cur| {
                if row.date > cur.date {
                    *cur = row;
                }
            })
            .or_insert(row);
    }
    latest.into_values().collect()
}

/// "financials_Total Revenue" -> "Total Revenue".
pub fn display_metric(metric: &str) -> &str {
    METRIC_PREFIXES
        .iter()
        .find_map(|p| metric.strip_prefix(p))
        .unwrap_or(metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_metric_prefers_request_then_default() {
        let rows = vec![
            row("2023-03-31", "balance_sheet_Cash", Some(1.0)),
            row("2023-03-31", DEFAULT_METRIC, Some(2.0)),
        ];
        assert_eq!(select_metric(&rows, Some("balance_sheet_Cash")).as_deref(), Some("balance_sheet_Cash"));
        assert_eq!(select_metric(&rows, Some("nope")).as_deref(), Some(DEFAULT_METRIC));
        assert_eq!(select_metric(&rows, None).as_deref(), Some(DEFAULT_METRIC));
        let no_default = vec![row("2023-03-31", "cashflow_Capex", None), row("2023-03-31", "a_metric", None)];
        assert_eq!(select_metric(&no_default, None).as_deref(), Some("a_metric"));
        assert_eq!(select_metric(&[], None), None);
    }

    #[test]
    fn latest_values_picks_newest_per_metric() {
        let rows = vec![
            row("2022-03-31", "b", Some(1.0)),
            row("2023-03-31", "a", Some(5.0)),
            row("2023-03-31", "b", Some(2.0)),
            row("2021-03-31", "a", Some(4.0)),
        ];
        let latest = latest_values(&rows);
        let got: Vec<(&str, f64)> = latest.iter().map(|f| (f.metric.as_str(), f.value_or_zero())).collect();
        assert_eq!(got, vec![("a", 5.0), ("b", 2.0)]);
    }

    fn row(date: &str, metric: &str, value: Option<f64>) -> Fundamental {
        Fundamental {
            id: 0,
            company_id: 1,
            date: date.into(),
            metric: metric.into(),
            value,
        }
    }

    #[test]
    fn missing_and_nan_values_read_as_zero() {
        assert_eq!(row("2024-03-31", "x", None).value_or_zero(), 0.0);
        assert_eq!(row("2024-03-31", "x", Some(f64::NAN)).value_or_zero(), 0.0);
        assert_eq!(row("2024-03-31", "x", Some(f64::INFINITY)).value_or_zero(), 0.0);
        assert_eq!(row("2024-03-31", "x", Some(4.5)).value_or_zero(), 4.5);
    }

    #[test]
    fn metric_series_filters_and_sorts_by_date() {
        let rows = vec![
            row("2024-03-31", DEFAULT_METRIC, Some(3.0)),
            row("2022-03-31", DEFAULT_METRIC, Some(1.0)),
            row("2023-03-31", "financials_Net Income", Some(9.0)),
            row("2023-03-31", DEFAULT_METRIC, Some(2.0)),
        ];
        let series = metric_series(&rows, DEFAULT_METRIC);
        let values: Vec<f64> = series.iter().map(|f| f.value_or_zero()).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn metric_names_are_distinct_and_sorted() {
        let rows = vec![
            row("2024-03-31", "b", None),
            row("2023-03-31", "a", None),
            row("2022-03-31", "b", None),
        ];
        assert_eq!(metric_names(&rows), vec!["a".to_string(), "b".to_string()]);
        assert!(metric_names(&[]).is_empty());
    }

    #[test]
    fn display_metric_strips_known_prefixes() {
        assert_eq!(display_metric(DEFAULT_METRIC), "Total Revenue");
        assert_eq!(display_metric("balance_sheet_Total Assets"), "Total Assets");
        assert_eq!(display_metric("PE"), "PE");
    }

    #[test]
    fn decodes_null_value() {
        let f: Fundamental = serde_json::from_str(
            r#"{"id":1,"company_id":2,"date":"2024-03-31","metric":"PE","value":null}"#,
        )
        .unwrap();
        assert_eq!(f.value, None);
    }
}
