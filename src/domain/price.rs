//! Daily price bars as returned by the backend.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::DashError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Open")]
    pub open: f64,
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Low")]
    pub low: f64,
    #[serde(alias = "Close")]
    pub close: f64,
    #[serde(default, alias = "Volume")]
    pub volume: f64,
}

impl PriceBar {
    /// Date part of the bar timestamp; the backend sometimes sends full
    /// ISO datetimes.
    pub fn day(&self) -> &str {
        self.date.split('T').next().unwrap_or(&self.date)
    }
}

/// `/prices/{key}` answers either a bare list or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Wrapped { data: Vec<PriceBar> },
    Bare(Vec<PriceBar>),
}

impl PriceResponse {
    pub fn into_bars(self) -> Vec<PriceBar> {
        match self {
            PriceResponse::Wrapped { data } => data,
            PriceResponse::Bare(bars) => bars,
        }
    }
}

/// Which price of a bar a single-series view plots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceField {
    pub const ALL: [PriceField; 4] = [PriceField::Close, PriceField::Open, PriceField::High, PriceField::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
        }
    }

    pub fn of(&self, bar: &PriceBar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriceField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DashError::invalid_input(format!("Unknown price field: {s}")))
    }
}

/// Bars inside `[from, to]`, sorted by date. Bars whose date does not parse
/// are kept only when no bound is set.
pub fn bars_in_range(bars: &[PriceBar], from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<PriceBar> {
    let mut out: Vec<PriceBar> = bars
        .iter()
        .filter(|b| {
            if from.is_none() && to.is_none() {
                return true;
            }
            let Ok(day) = NaiveDate::parse_from_str(b.day(), "%Y-%m-%d") else {
                return false;
            };
            from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| a.day().cmp(b.day()));
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl PriceSummary {
    /// `None` for an empty slice.
    pub fn of(bars: &[PriceBar], field: PriceField) -> Option<Self> {
        if bars.is_empty() {
            return None;
        }
        let values = bars.iter().map(|b| field.of(b));
        let (sum, min, max) = values.fold((0.0, f64::INFINITY, f64::NEG_INFINITY), |(s, lo, hi), v| {
            (s + v, lo.min(v), hi.max(v))
        });
        Some(Self {
            avg: sum / bars.len() as f64,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date.to_string(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 0.0,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn range_filter_is_inclusive_and_sorted() {
        let bars = vec![bar("2024-01-03", 3.0), bar("2024-01-01", 1.0), bar("2024-01-02", 2.0)];
        let inside = bars_in_range(&bars, Some(day("2024-01-02")), Some(day("2024-01-03")));
        let dates: Vec<&str> = inside.iter().map(|b| b.day()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03"]);

        let all = bars_in_range(&bars, None, None);
        assert_eq!(all.first().map(|b| b.day()), Some("2024-01-01"));
    }

    #[test]
    fn range_filter_handles_datetimes_and_garbage() {
        let bars = vec![bar("2024-01-05T00:00:00", 5.0), bar("soon", 9.0)];
        assert_eq!(bars_in_range(&bars, Some(day("2024-01-01")), None).len(), 1);
        assert_eq!(bars_in_range(&bars, None, None).len(), 2);
    }

    #[test]
    fn summary_over_selected_field() {
        let bars = vec![bar("2024-01-01", 10.0), bar("2024-01-02", 20.0)];
        let close = PriceSummary::of(&bars, PriceField::Close).unwrap();
        approx::assert_relative_eq!(close.avg, 15.0);
        approx::assert_relative_eq!(close.min, 10.0);
        approx::assert_relative_eq!(close.max, 20.0);
        let high = PriceSummary::of(&bars, PriceField::High).unwrap();
        approx::assert_relative_eq!(high.max, 22.0);
        assert!(PriceSummary::of(&[], PriceField::Close).is_none());
    }

    #[test]
    fn price_field_parses_case_insensitively() {
        assert_eq!("High".parse::<PriceField>().unwrap(), PriceField::High);
        assert_eq!(PriceField::default(), PriceField::Close);
        assert!("volume".parse::<PriceField>().is_err());
    }

    #[test]
    fn decodes_bare_list() {
        let json = r#"[{"date":"2024-01-02","open":1,"high":2,"low":0.5,"close":1.5,"volume":100}]"#;
        let bars = serde_json::from_str::<PriceResponse>(json).unwrap().into_bars();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.5);
    }

    #[test]
    fn decodes_wrapped_list_with_capitalized_keys() {
        let json = r#"{"data":[{"Date":"2024-01-02T00:00:00","Open":1,"High":2,"Low":0.5,"Close":1.5}]}"#;
        let bars = serde_json::from_str::<PriceResponse>(json).unwrap().into_bars();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].day(), "2024-01-02");
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn decodes_empty_wrapped_list() {
        let bars = serde_json::from_str::<PriceResponse>(r#"{"data":[]}"#)
            .unwrap()
            .into_bars();
        assert!(bars.is_empty());
    }
}
