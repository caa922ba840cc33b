//! HTML templates using Askama.
//!
//! Every view template renders a fragment. Full-page requests get that
//! fragment wrapped in [`BasePage`].

use askama::Template;

use crate::domain::backtest::{BacktestReport, BacktestSummary, SymbolTrade};
use crate::domain::company::{Company, TopCompany};
use crate::domain::fundamental::{Fundamental, display_metric};
use crate::domain::news::NewsArticle;
use crate::domain::price::{PriceField, PriceSummary};
use crate::domain::strategy::{StrategyDef, StrategyKind, StrategyTemplate};

#[derive(Template)]
#[template(path = "base.html")]
pub struct BasePage<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}

/// Inline message shown in place of data a view could not load.
#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticeTemplate<'a> {
    pub message: &'a str,
    pub is_error: bool,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub company_count: usize,
}

#[derive(Template)]
#[template(path = "companies.html")]
pub struct CompaniesTemplate<'a> {
    pub name: &'a str,
    pub sector: &'a str,
    pub companies: &'a [Company],
}

#[derive(Template)]
#[template(path = "company_grid.html")]
pub struct CompanyGridTemplate<'a> {
    pub companies: &'a [Company],
}

#[derive(Template)]
#[template(path = "price_overview.html")]
pub struct PriceOverviewTemplate<'a> {
    pub id: i64,
    pub name: &'a str,
    pub symbol: &'a str,
    pub chart_svg: &'a str,
    pub message: Option<&'a str>,
}

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn price_field_options(selected: PriceField) -> Vec<SelectOption> {
    PriceField::ALL
        .iter()
        .map(|f| SelectOption {
            value: f.as_str().to_string(),
            label: f.label().to_string(),
            selected: *f == selected,
        })
        .collect()
}

pub fn strategy_kind_options(selected: StrategyKind) -> Vec<SelectOption> {
    StrategyKind::ALL
        .iter()
        .map(|k| SelectOption {
            value: k.as_str().to_string(),
            label: k.label().to_string(),
            selected: *k == selected,
        })
        .collect()
}

pub fn metric_options(names: &[String], selected: &str) -> Vec<SelectOption> {
    names
        .iter()
        .map(|n| SelectOption {
            value: n.clone(),
            label: display_metric(n).to_string(),
            selected: n == selected,
        })
        .collect()
}

pub fn template_options(templates: &[StrategyTemplate], selected: Option<&str>) -> Vec<SelectOption> {
    templates
        .iter()
        .map(|t| SelectOption {
            value: t.name.to_string(),
            label: t.name.to_string(),
            selected: selected == Some(t.name),
        })
        .collect()
}

pub struct ParamInput {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

pub fn param_inputs(kind: StrategyKind) -> Vec<ParamInput> {
    kind.params()
        .iter()
        .map(|p| ParamInput {
            key: p.key,
            label: p.label,
            value: format_number(p.default),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "strategy_params.html")]
pub struct StrategyParamsTemplate {
    pub params: Vec<ParamInput>,
}

pub struct SummaryView {
    pub avg: String,
    pub min: String,
    pub max: String,
}

impl SummaryView {
    pub fn new(summary: Option<PriceSummary>) -> Self {
        match summary {
            Some(s) => Self {
                avg: format!("{:.2}", s.avg),
                min: format!("{:.2}", s.min),
                max: format!("{:.2}", s.max),
            },
            None => Self {
                avg: "-".into(),
                min: "-".into(),
                max: "-".into(),
            },
        }
    }
}

pub struct MetricRow {
    pub metric: String,
    pub date: String,
    pub value: String,
}

impl MetricRow {
    pub fn new(f: &Fundamental) -> Self {
        Self {
            metric: display_metric(&f.metric).to_string(),
            date: f.date.clone(),
            value: format_number(f.value_or_zero()),
        }
    }
}

#[derive(Template)]
#[template(path = "company_detail.html")]
pub struct CompanyDetailTemplate<'a> {
    pub company: &'a Company,
    pub fields: Vec<SelectOption>,
    pub field_label: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub summary: SummaryView,
    pub chart_svg: &'a str,
    pub price_message: Option<&'a str>,
    pub key_metrics: Vec<MetricRow>,
    pub kinds: Vec<SelectOption>,
    pub params: Vec<ParamInput>,
}

#[derive(Template)]
#[template(path = "news.html")]
pub struct NewsTemplate<'a> {
    pub symbol: &'a str,
    pub articles: &'a [NewsArticle],
    pub error: Option<&'a str>,
}

pub struct SymbolTradeRow {
    pub entry_date: String,
    pub exit_date: String,
    pub entry_price: String,
    pub exit_price: String,
    pub return_pct: String,
    pub positive: bool,
}

impl SymbolTradeRow {
    pub fn new(t: &SymbolTrade) -> Self {
        Self {
            entry_date: t.entry_date.clone(),
            exit_date: t.exit_date.clone(),
            entry_price: format_number(t.entry_price),
            exit_price: format_number(t.exit_price),
            return_pct: format!("{}%", format_number(t.return_pct)),
            positive: t.return_pct >= 0.0,
        }
    }
}

#[derive(Template)]
#[template(path = "symbol_backtest.html")]
pub struct SymbolBacktestTemplate<'a> {
    pub total_return: String,
    pub win_rate: String,
    pub max_drawdown: String,
    pub equity_svg: &'a str,
    pub trades: Vec<SymbolTradeRow>,
}

impl<'a> SymbolBacktestTemplate<'a> {
    pub fn new(summary: &BacktestSummary, equity_svg: &'a str, trades: &[SymbolTrade]) -> Self {
        Self {
            total_return: format!("{:.2} %", summary.total_return),
            win_rate: format!("{:.1} %", summary.win_rate),
            max_drawdown: format!("{:.1} %", summary.max_drawdown),
            equity_svg,
            trades: trades.iter().map(SymbolTradeRow::new).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "fundamentals.html")]
pub struct FundamentalsTemplate<'a> {
    pub company_id: i64,
    pub company_name: &'a str,
    pub metrics: Vec<SelectOption>,
    pub chart_svg: &'a str,
    pub rows: Vec<MetricRow>,
    pub message: Option<&'a str>,
}

pub struct StrategyRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub parameters: String,
}

impl StrategyRow {
    pub fn new(s: &StrategyDef) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            description: s.description.clone().unwrap_or_default(),
            created_at: s.created_at.clone().unwrap_or_default(),
            parameters: s.parameters_pretty(),
        }
    }
}

#[derive(Template)]
#[template(path = "strategies.html")]
pub struct StrategiesTemplate<'a> {
    pub templates: Vec<SelectOption>,
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a str,
    pub strategies: Vec<StrategyRow>,
    pub error: Option<&'a str>,
    pub flash: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "backtest_form.html")]
pub struct BacktestFormTemplate<'a> {
    pub strategies: &'a [StrategyDef],
    pub strategies_error: Option<&'a str>,
    pub top_companies: &'a [TopCompany],
    pub first_company: Option<i64>,
    pub initial_capital: String,
    pub roe_min: String,
}

#[derive(Template)]
#[template(path = "roe_field.html")]
pub struct RoeFieldTemplate {
    pub roe_min: String,
}

#[derive(Template)]
#[template(path = "chart.html")]
pub struct ChartTemplate<'a> {
    pub chart_svg: &'a str,
}

#[derive(Template)]
#[template(path = "backtest_result.html")]
pub struct BacktestResultTemplate<'a> {
    pub report: &'a BacktestReport,
    pub equity_svg: &'a str,
    pub allocation_svg: &'a str,
    pub download_id: Option<i64>,
}

/// Two decimals, dropping a zero fraction: `20`, `14.5`, `0.33`.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
