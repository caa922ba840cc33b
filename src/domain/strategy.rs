//! Strategy definitions, creation templates and per-symbol strategy kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::DashError;

/// A strategy stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parameters: Value,
}

impl StrategyDef {
    pub fn parameters_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.parameters).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Body of `POST /strategies/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStrategy {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl NewStrategy {
    /// Build from raw form fields. `parameters` is user-typed JSON.
    pub fn from_form(name: &str, description: &str, parameters: &str) -> Result<Self, DashError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DashError::invalid_input("Strategy name is required"));
        }
        let raw = if parameters.trim().is_empty() { "{}" } else { parameters };
        let parameters: Value = serde_json::from_str(raw)
            .map_err(|e| DashError::invalid_input(format!("Parameters must be valid JSON: {e}")))?;
        Ok(Self {
            name: name.to_string(),
            description: description.trim().to_string(),
            parameters,
        })
    }
}

/// A canned strategy offered in the create form.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl StrategyTemplate {
    pub fn parameters_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.parameters).unwrap_or_else(|_| "{}".to_string())
    }
}

pub fn templates() -> Vec<StrategyTemplate> {
    vec![
        StrategyTemplate {
            name: "Top ROE",
            description: "Selects top companies by Return on Equity.",
            parameters: json!({
                "filter": { "ROE_min": 15 },
                "ranking": ["ROE DESC"],
                "position_sizing": "equal_weight",
            }),
        },
        StrategyTemplate {
            name: "Low P/E",
            description: "Selects companies with lowest Price/Earnings ratio.",
            parameters: json!({
                "filter": { "PE_max": 10 },
                "ranking": ["PE ASC"],
                "position_sizing": "equal_weight",
            }),
        },
        StrategyTemplate {
            name: "Large Cap Growth",
            description: "Focuses on large-cap companies with high EPS growth.",
            parameters: json!({
                "filter": { "market_cap_min": 10000, "EPS_growth_min": 10 },
                "ranking": ["EPS_growth DESC"],
                "position_sizing": "equal_weight",
            }),
        },
    ]
}

pub fn find_template(name: &str) -> Option<StrategyTemplate> {
    templates().into_iter().find(|t| t.name == name)
}

/// One numeric input of a symbol strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub default: f64,
}

const SMA_PARAMS: [ParamSpec; 2] = [
    ParamSpec { key: "short_window", label: "Short Window", default: 20.0 },
    ParamSpec { key: "long_window", label: "Long Window", default: 50.0 },
];

const RSI_PARAMS: [ParamSpec; 3] = [
    ParamSpec { key: "period", label: "Period", default: 14.0 },
    ParamSpec { key: "overbought", label: "Overbought", default: 70.0 },
    ParamSpec { key: "oversold", label: "Oversold", default: 30.0 },
];

/// Built-in strategies the backend can run against a single symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    SmaCrossover,
    Rsi,
    BuyHold,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::SmaCrossover, StrategyKind::Rsi, StrategyKind::BuyHold];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover => "sma_crossover",
            StrategyKind::Rsi => "rsi",
            StrategyKind::BuyHold => "buy_hold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover => "SMA Crossover",
            StrategyKind::Rsi => "RSI",
            StrategyKind::BuyHold => "Buy & Hold",
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            StrategyKind::SmaCrossover => &SMA_PARAMS,
            StrategyKind::Rsi => &RSI_PARAMS,
            StrategyKind::BuyHold => &[],
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| DashError::invalid_input(format!("Unknown strategy: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_form_parses_parameters() {
        let s = NewStrategy::from_form("Mine", " desc ", r#"{"filter": {"PE_max": 12}}"#).unwrap();
        assert_eq!(s.name, "Mine");
        assert_eq!(s.description, "desc");
        assert_eq!(s.parameters["filter"]["PE_max"], 12);
    }

    #[test]
    fn from_form_treats_blank_parameters_as_empty_object() {
        let s = NewStrategy::from_form("Mine", "", "  ").unwrap();
        assert_eq!(s.parameters, json!({}));
    }

    #[test]
    fn from_form_rejects_bad_json() {
        let err = NewStrategy::from_form("Mine", "", "{not json").unwrap_err();
        assert!(err.user_message().starts_with("Parameters must be valid JSON"));
    }

    #[test]
    fn from_form_rejects_empty_name() {
        assert!(NewStrategy::from_form("  ", "", "{}").is_err());
    }

    #[test]
    fn templates_match_names() {
        let names: Vec<&str> = templates().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Top ROE", "Low P/E", "Large Cap Growth"]);
        let low_pe = find_template("Low P/E").unwrap();
        assert_eq!(low_pe.parameters["filter"]["PE_max"], 10);
        assert!(find_template("nope").is_none());
    }

    #[test]
    fn template_parameters_pretty_print() {
        let top = find_template("Top ROE").unwrap();
        let text = top.parameters_pretty();
        assert!(text.contains("\"ROE_min\": 15"));
        assert!(text.contains('\n'));
    }

    #[test]
    fn strategy_kind_round_trips_through_str() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("macd".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn strategy_kind_params() {
        let sma: Vec<&str> = StrategyKind::SmaCrossover.params().iter().map(|p| p.key).collect();
        assert_eq!(sma, vec!["short_window", "long_window"]);
        assert_eq!(StrategyKind::Rsi.params().len(), 3);
        assert!(StrategyKind::BuyHold.params().is_empty());
    }

    #[test]
    fn strategy_def_decodes_without_description() {
        let s: StrategyDef =
            serde_json::from_str(r#"{"id":7,"name":"Top ROE","parameters":{"a":1}}"#).unwrap();
        assert_eq!(s.description, None);
        assert!(s.parameters_pretty().contains("\"a\": 1"));
    }
}
