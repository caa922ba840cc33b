//! CSV and JSON downloads of a portfolio backtest result.

use super::backtest::BacktestReport;
use super::error::DashError;

/// A rendered download: body plus the filename offered to the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn render(&self, report: &BacktestReport) -> Result<Export, DashError> {
        match self {
            ExportFormat::Csv => export_csv(report),
            ExportFormat::Json => export_json(report),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(DashError::invalid_input(format!("unknown export format: {other}"))),
        }
    }
}

/// The untouched backend result, pretty-printed.
pub fn export_json(report: &BacktestReport) -> Result<Export, DashError> {
    let body = serde_json::to_string_pretty(&report.raw).map_err(|e| DashError::Export {
        reason: e.to_string(),
    })?;
    Ok(Export {
        filename: format!("{}.json", report.file_stem()),
        content_type: "application/json",
        body,
    })
}

/// Metrics, equity curve and allocation history as three blank-line
/// separated CSV sections.
pub fn export_csv(report: &BacktestReport) -> Result<Export, DashError> {
    let metrics = write_section(
        &["Metrics"],
        None,
        report.metrics.iter().map(|m| vec![m.name.clone(), m.value.clone()]),
    )?;
    let equity = write_section(
        &["Equity Curve"],
        Some(&["Date", "Capital"]),
        report
            .equity_curve
            .iter()
            .map(|p| vec![p.date.clone(), p.value.to_string()]),
    )?;
    let allocations = write_section(
        &["Allocation History"],
        Some(&["Date", "CompanyID", "Allocation"]),
        report.allocation_history.iter().flat_map(|snap| {
            snap.allocations
                .iter()
                .map(|a| vec![snap.date.clone(), a.company_id.clone(), a.weight.to_string()])
        }),
    )?;

    Ok(Export {
        filename: format!("{}.csv", report.file_stem()),
        content_type: "text/csv",
        body: [metrics, equity, allocations].join("\n"),
    })
}

fn write_section<I>(title: &[&str], header: Option<&[&str]>, rows: I) -> Result<String, DashError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    wtr.write_record(title)?;
    if let Some(header) = header {
        wtr.write_record(header)?;
    }
    for row in rows {
        wtr.write_record(&row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| DashError::Export {
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| DashError::Export {
        reason: e.to_string(),
    })
}
