//! Backtest requests and the shape of their results.
//!
//! Two kinds of backtest exist. A portfolio backtest (`POST /run`) runs a
//! stored strategy over a date range and returns metrics, an equity curve and
//! an allocation history. A symbol backtest (`POST /backtest/{symbol}`) runs one
//! of the built-in [`StrategyKind`]s on a single stock.
//!
//! The backend is loose about response shapes, so results are decoded from
//! raw JSON and normalized here. The raw value is kept for export.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::DashError;
use super::strategy::StrategyKind;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_ROE_MIN: f64 = 15.0;

const FILL_ALL_FIELDS: &str = "Fill all fields properly";

/// Body of `POST /run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRequest {
    pub strategy_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub roe_min: f64,
}

/// Raw portfolio backtest form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestForm {
    #[serde(default)]
    pub strategy_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub initial_capital: String,
    #[serde(default)]
    pub roe_min: String,
}

impl BacktestForm {
    pub fn validate(&self) -> Result<BacktestRequest, DashError> {
        let fill_all = || DashError::invalid_input(FILL_ALL_FIELDS);

        let strategy_id: i64 = self.strategy_id.trim().parse().map_err(|_| fill_all())?;
        let start_date = parse_date(&self.start_date)?.ok_or_else(fill_all)?;
        let end_date = parse_date(&self.end_date)?.ok_or_else(fill_all)?;
        let initial_capital: f64 = self
            .initial_capital
            .trim()
            .parse()
            .map_err(|_| fill_all())?;
        if !(initial_capital.is_finite() && initial_capital > 0.0) {
            return Err(fill_all());
        }
        let roe_min = match self.roe_min.trim() {
            "" => DEFAULT_ROE_MIN,
            raw => raw
                .parse()
                .map_err(|_| DashError::invalid_input("Invalid ROE"))?,
        };

        Ok(BacktestRequest {
            strategy_id,
            start_date,
            end_date,
            initial_capital,
            roe_min,
        })
    }
}

/// Parse an HTML date input. Blank means "not set".
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, DashError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| DashError::invalid_input(format!("Invalid date: {raw}")))
}

pub fn roe_step_up(roe: f64) -> f64 {
    roe + 1.0
}

/// The ROE stepper never goes below 1.
pub fn roe_step_down(roe: f64) -> f64 {
    if roe > 1.0 { roe - 1.0 } else { roe }
}

/// Body of `POST /backtest/{symbol}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolBacktestRequest {
    pub strategy: StrategyKind,
    pub params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Raw single-symbol backtest form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolBacktestForm {
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub short_window: Option<String>,
    pub long_window: Option<String>,
    pub period: Option<String>,
    pub overbought: Option<String>,
    pub oversold: Option<String>,
}

impl SymbolBacktestForm {
    fn raw_param(&self, key: &str) -> Option<&str> {
        match key {
            "short_window" => self.short_window.as_deref(),
            "long_window" => self.long_window.as_deref(),
            "period" => self.period.as_deref(),
            "overbought" => self.overbought.as_deref(),
            "oversold" => self.oversold.as_deref(),
            _ => None,
        }
    }

    /// Only the selected kind's parameters are sent; unparsable ones fall
    /// back to their defaults.
    pub fn validate(&self) -> Result<SymbolBacktestRequest, DashError> {
        let strategy = if self.strategy.trim().is_empty() {
            StrategyKind::default()
        } else {
            self.strategy.parse()?
        };

        let mut params = Map::new();
        for spec in strategy.params() {
            let value = self
                .raw_param(spec.key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(spec.default);
            params.insert(spec.key.to_string(), number_value(value));
        }

        Ok(SymbolBacktestRequest {
            strategy,
            params,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
        })
    }
}

/// Whole numbers go over the wire as integers.
fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

/// Render a JSON scalar the way it would appear in a table cell.
pub fn display_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{f}"),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Deserialize)]
struct RawEquityPoint {
    date: String,
    #[serde(alias = "capital", alias = "equity")]
    value: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EquityCurveShape {
    Columns { dates: Vec<String>, values: Vec<f64> },
    Points(Vec<RawEquityPoint>),
}

impl EquityCurveShape {
    fn into_points(self) -> Vec<EquityPoint> {
        match self {
            EquityCurveShape::Columns { dates, values } => dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| EquityPoint { date, value })
                .collect(),
            EquityCurveShape::Points(points) => points
                .into_iter()
                .map(|p| EquityPoint {
                    date: p.date,
                    value: p.value,
                })
                .collect(),
        }
    }
}

/// Accepts `{dates, values}`, `[{date, value}]` and `[{date, capital}]`.
/// Anything else is treated as an empty curve.
pub fn normalize_equity_curve(value: &Value) -> Vec<EquityPoint> {
    EquityCurveShape::deserialize(value)
        .map(EquityCurveShape::into_points)
        .unwrap_or_default()
}

fn deserialize_equity_curve<'de, D>(deserializer: D) -> Result<Vec<EquityPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_equity_curve(&value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub company_id: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSnapshot {
    pub date: String,
    pub allocations: Vec<Allocation>,
}

impl AllocationSnapshot {
    pub fn weight_of(&self, company_id: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.company_id == company_id)
            .map(|a| a.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: String,
}

/// One row of a portfolio trade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeLogEntry {
    pub date: String,
    pub symbol: String,
    pub action: String,
    pub quantity: String,
    pub price: String,
}

/// A decoded portfolio backtest result.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub backtest_id: Option<i64>,
    pub strategy_id: Option<i64>,
    pub message: Option<String>,
    pub metrics: Vec<Metric>,
    pub equity_curve: Vec<EquityPoint>,
    pub allocation_history: Vec<AllocationSnapshot>,
    pub trades: Vec<TradeLogEntry>,
    pub raw: Value,
}

impl BacktestReport {
    /// Decode a `/run` response, unwrapping a `result` or `data` envelope.
    pub fn from_json(value: Value) -> Self {
        let raw = match value {
            Value::Object(mut obj) if obj.get("result").is_some_and(Value::is_object) => {
                obj.remove("result").unwrap_or_default()
            }
            Value::Object(mut obj) if obj.get("data").is_some_and(Value::is_object) => {
                obj.remove("data").unwrap_or_default()
            }
            other => other,
        };

        let metrics = raw
            .get("metrics")
            .or_else(|| raw.get("performance_metrics"))
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .map(|(name, v)| Metric {
                        name: name.clone(),
                        value: display_scalar(v),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let equity_curve = raw
            .get("equity_curve")
            .map(normalize_equity_curve)
            .unwrap_or_default();

        let allocation_history = raw
            .get("allocation_history")
            .and_then(Value::as_array)
            .map(|snaps| snaps.iter().filter_map(decode_snapshot).collect())
            .unwrap_or_default();

        let trades = raw
            .pointer("/logs/trades")
            .or_else(|| raw.get("trades"))
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(decode_trade).collect())
            .unwrap_or_default();

        Self {
            backtest_id: raw
                .get("backtest_id")
                .or_else(|| raw.get("id"))
                .and_then(Value::as_i64),
            strategy_id: raw.get("strategy_id").and_then(Value::as_i64),
            message: raw.get("message").and_then(Value::as_str).map(str::to_string),
            metrics,
            equity_curve,
            allocation_history,
            trades,
            raw,
        }
    }

    /// `backtest_{id}`, used for download filenames.
    pub fn file_stem(&self) -> String {
        match self.backtest_id {
            Some(id) => format!("backtest_{id}"),
            None => "backtest_unknown".to_string(),
        }
    }
}

fn decode_snapshot(value: &Value) -> Option<AllocationSnapshot> {
    let date = value.get("date").map(display_scalar)?;
    let allocations = value
        .get("allocations")
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .map(|(company_id, w)| Allocation {
                    company_id: company_id.clone(),
                    weight: w.as_f64().unwrap_or(0.0),
                })
                .collect()
        })
        .unwrap_or_default();
    Some(AllocationSnapshot { date, allocations })
}

fn decode_trade(value: &Value) -> TradeLogEntry {
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| value.get(*k))
            .map(display_scalar)
            .unwrap_or_default()
    };
    TradeLogEntry {
        date: field(&["date"]),
        symbol: field(&["symbol"]),
        action: field(&["action"]),
        quantity: field(&["qty", "quantity"]),
        price: field(&["price"]),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    #[serde(default)]
    pub total_return: f64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTrade {
    pub entry_date: String,
    pub exit_date: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
}

/// Result of a single-symbol backtest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SymbolBacktestReport {
    #[serde(default)]
    pub summary: BacktestSummary,
    #[serde(default, deserialize_with = "deserialize_equity_curve")]
    pub equity_curve: Vec<EquityPoint>,
    #[serde(default)]
    pub trades: Vec<SymbolTrade>,
}

/// `/companies/{id}/monthly_pnl`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPnl {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub returns: Vec<f64>,
}
