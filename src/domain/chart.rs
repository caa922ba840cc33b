//! Chart datasets assembled from backend data.
//!
//! A [`ChartData`] is a set of labelled series sharing one x axis. Every
//! builder keeps `dataset.values.len() == labels.len()`, and all of them
//! accept empty input.

use serde::Serialize;

use super::backtest::{AllocationSnapshot, EquityPoint, MonthlyPnl};
use super::fundamental::{Fundamental, display_metric, metric_series};
use super::price::{PriceBar, PriceField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    /// `None` leaves a gap.
    pub values: Vec<Option<f64>>,
    pub color: String,
}

impl Dataset {
    fn dense(label: impl Into<String>, values: impl IntoIterator<Item = f64>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: values.into_iter().map(Some).collect(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Min and max over every present value, or `None` when there are none.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.datasets
            .iter()
            .flat_map(|d| d.values.iter().flatten().copied())
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub const CLOSE_COLOR: &str = "#00ffff";
pub const OPEN_COLOR: &str = "#a78bfa";
pub const HIGH_COLOR: &str = "#00e676";
pub const LOW_COLOR: &str = "#ff4081";
const SERIES_COLOR: &str = "rgb(75, 192, 192)";

/// Close, Open, High, Low lines over the bar dates.
pub fn price_chart(name: &str, bars: &[PriceBar]) -> ChartData {
    ChartData {
        title: format!("{name} Price Overview"),
        kind: ChartKind::Line,
        labels: bars.iter().map(|b| b.day().to_string()).collect(),
        datasets: vec![
            Dataset::dense("Close", bars.iter().map(|b| b.close), CLOSE_COLOR),
            Dataset::dense("Open", bars.iter().map(|b| b.open), OPEN_COLOR),
            Dataset::dense("High", bars.iter().map(|b| b.high), HIGH_COLOR),
            Dataset::dense("Low", bars.iter().map(|b| b.low), LOW_COLOR),
        ],
    }
}

/// One price field over time, coloured like its line in [`price_chart`].
pub fn price_field_chart(name: &str, bars: &[PriceBar], field: PriceField) -> ChartData {
    let color = match field {
        PriceField::Close => CLOSE_COLOR,
        PriceField::Open => OPEN_COLOR,
        PriceField::High => HIGH_COLOR,
        PriceField::Low => LOW_COLOR,
    };
    ChartData {
        title: format!("{name} {}", field.label()),
        kind: ChartKind::Line,
        labels: bars.iter().map(|b| b.day().to_string()).collect(),
        datasets: vec![Dataset::dense(field.label(), bars.iter().map(|b| field.of(b)), color)],
    }
}

pub fn fundamentals_chart(metric: &str, rows: &[Fundamental]) -> ChartData {
    let series = metric_series(rows, metric);
    let label = display_metric(metric);
    ChartData {
        title: label.to_string(),
        kind: ChartKind::Line,
        labels: series.iter().map(|f| f.date.clone()).collect(),
        datasets: vec![Dataset::dense(
            label,
            series.iter().map(|f| f.value_or_zero()),
            SERIES_COLOR,
        )],
    }
}

pub fn equity_chart(points: &[EquityPoint]) -> ChartData {
    ChartData {
        title: "Equity Curve".to_string(),
        kind: ChartKind::Line,
        labels: points.iter().map(|p| p.date.clone()).collect(),
        datasets: vec![Dataset::dense(
            "Equity Curve",
            points.iter().map(|p| p.value),
            SERIES_COLOR,
        )],
    }
}

/// Bar colour of the `idx`-th allocation series.
pub fn allocation_color(idx: usize) -> String {
    format!("hsl({}, 70%, 50%)", (idx * 40) % 360)
}

/// One bar series per company of the first snapshot.
pub fn allocation_chart(history: &[AllocationSnapshot]) -> ChartData {
    let company_ids: Vec<&str> = history
        .first()
        .map(|s| s.allocations.iter().map(|a| a.company_id.as_str()).collect())
        .unwrap_or_default();

    let datasets = company_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| Dataset {
            label: format!("Company {id}"),
            values: history.iter().map(|s| s.weight_of(id)).collect(),
            color: allocation_color(idx),
        })
        .collect();

    ChartData {
        title: "Quarterly Allocation per Company".to_string(),
        kind: ChartKind::Bar,
        labels: history.iter().map(|s| s.date.clone()).collect(),
        datasets,
    }
}

/// Dates and returns are paired up; a length mismatch truncates to the
/// shorter side.
pub fn monthly_pnl_chart(pnl: &MonthlyPnl) -> ChartData {
    let n = pnl.dates.len().min(pnl.returns.len());
    ChartData {
        title: "Monthly Profit & Loss".to_string(),
        kind: ChartKind::Line,
        labels: pnl.dates[..n].to_vec(),
        datasets: vec![Dataset::dense(
            "Monthly P&L (%)",
            pnl.returns[..n].iter().copied(),
            SERIES_COLOR,
        )],
    }
}
