//! HTTP request handlers for web adapter.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::adapters::chart_svg::render_chart;
use crate::domain::backtest::{
    BacktestForm, DEFAULT_INITIAL_CAPITAL, DEFAULT_ROE_MIN, SymbolBacktestForm, parse_date, roe_step_down,
    roe_step_up,
};
use crate::domain::chart::{allocation_chart, equity_chart, fundamentals_chart, monthly_pnl_chart, price_chart, price_field_chart};
use crate::domain::company::{Company, CompanyFilter, lookup_company, nifty50};
use crate::domain::export::ExportFormat;
use crate::domain::fundamental::{display_metric, latest_values, metric_names, metric_series, select_metric};
use crate::domain::price::{PriceField, PriceSummary, bars_in_range};
use crate::domain::strategy::{NewStrategy, StrategyKind, find_template, templates as strategy_templates};

use super::templates::{
    BacktestFormTemplate, BacktestResultTemplate, ChartTemplate, CompaniesTemplate, CompanyDetailTemplate,
    CompanyGridTemplate, FundamentalsTemplate, HomeTemplate, MetricRow, NewsTemplate, NoticeTemplate,
    PriceOverviewTemplate, RoeFieldTemplate, StrategiesTemplate, StrategyParamsTemplate, StrategyRow,
    SummaryView, SymbolBacktestTemplate, format_number, metric_options, param_inputs, price_field_options,
    strategy_kind_options, template_options,
};
use super::extract::{Form, Path, Query};
use super::{AppState, WebError, htmx_target, is_htmx_request, render_view};

const NO_PRICE_DATA: &str = "No price data";
const NO_PRICE_DATA_IN_RANGE: &str = "No price data in selected range.";
const NO_FUNDAMENTALS: &str = "No fundamentals data";
const NO_DATA: &str = "No data available";
const STRATEGIES_FAILED: &str = "Failed to fetch strategies";
const NEWS_FAILED: &str = "Failed to load news. Please try again later.";

/// A data-less notice that still answers 200 so htmx swaps it in.
fn notice(headers: &HeaderMap, message: &str, is_error: bool) -> Result<Response, WebError> {
    render_view(headers, "Notice", &NoticeTemplate { message, is_error })
}

fn company_or_404(id: i64, symbol: Option<&str>, name: Option<&str>) -> Result<Company, WebError> {
    lookup_company(id, symbol, name).ok_or_else(|| WebError::not_found(format!("Company {id} not found")))
}

pub async fn home(headers: HeaderMap) -> Result<Response, WebError> {
    render_view(
        &headers,
        "Home",
        &HomeTemplate {
            company_count: nifty50().len(),
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
}

pub async fn companies(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CompanyQuery>,
) -> Result<Response, WebError> {
    let all = nifty50();
    let found = CompanyFilter::new(&query.name, &query.sector)
        .resolve(&all, state.api.as_ref())
        .await;

    if is_htmx_request(&headers) && htmx_target(&headers) == Some("company-grid") {
        let grid = CompanyGridTemplate { companies: &found };
        return Ok(Html(grid.render()?).into_response());
    }

    let template = CompaniesTemplate {
        name: &query.name,
        sector: &query.sector,
        companies: &found,
    };
    render_view(&headers, "Companies", &template)
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
    pub name: Option<String>,
}

pub async fn price_overview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<SymbolQuery>,
) -> Result<Response, WebError> {
    let company = company_or_404(id, query.symbol.as_deref(), query.name.as_deref())?;

    let (chart_svg, message) = match state.api.prices(&company.symbol).await {
        Ok(bars) if !bars.is_empty() => (render_chart(&price_chart(&company.name, &bars)), None),
        Ok(_) => (String::new(), Some(NO_PRICE_DATA)),
        Err(e) => {
            warn!(symbol = %company.symbol, error = %e, "price fetch failed");
            (String::new(), Some(NO_PRICE_DATA))
        }
    };

    let template = PriceOverviewTemplate {
        id: company.id,
        name: &company.name,
        symbol: &company.symbol,
        chart_svg: &chart_svg,
        message,
    };
    render_view(&headers, &company.name, &template)
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub field: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn company_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<DetailQuery>,
) -> Result<Response, WebError> {
    let company = company_or_404(id, query.symbol.as_deref(), query.name.as_deref())?;
    let field = match query.field.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => f.parse::<PriceField>()?,
        None => PriceField::default(),
    };
    let from_raw = query.from.as_deref().unwrap_or_default();
    let to_raw = query.to.as_deref().unwrap_or_default();
    let from = parse_date(from_raw)?;
    let to = parse_date(to_raw)?;

    let api = state.api.as_ref();
    let (prices, fundamentals) = tokio::join!(api.prices(&company.symbol), async {
        if company.from_api {
            Ok(Vec::new())
        } else {
            api.fundamentals(company.id).await
        }
    });

    let bars = prices.unwrap_or_else(|e| {
        warn!(symbol = %company.symbol, error = %e, "price fetch failed");
        Vec::new()
    });
    let rows = fundamentals.unwrap_or_else(|e| {
        warn!(company_id = company.id, error = %e, "fundamentals fetch failed");
        Vec::new()
    });

    let in_range = bars_in_range(&bars, from, to);
    let price_message = if bars.is_empty() {
        Some(NO_PRICE_DATA)
    } else if in_range.is_empty() {
        Some(NO_PRICE_DATA_IN_RANGE)
    } else {
        None
    };
    let chart_svg = if price_message.is_none() {
        render_chart(&price_field_chart(&company.name, &in_range, field))
    } else {
        String::new()
    };

    let template = CompanyDetailTemplate {
        company: &company,
        fields: price_field_options(field),
        field_label: field.label(),
        from: from_raw,
        to: to_raw,
        summary: SummaryView::new(PriceSummary::of(&in_range, field)),
        chart_svg: &chart_svg,
        price_message,
        key_metrics: latest_values(&rows).into_iter().map(MetricRow::new).collect(),
        kinds: strategy_kind_options(StrategyKind::default()),
        params: param_inputs(StrategyKind::default()),
    };
    render_view(&headers, &company.name, &template)
}

pub async fn company_news(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<SymbolQuery>,
) -> Result<Response, WebError> {
    let company = company_or_404(id, query.symbol.as_deref(), query.name.as_deref())?;

    let (articles, error) = match state.api.news(&company.symbol).await {
        Ok(feed) => (feed.news, None),
        Err(e) => {
            warn!(symbol = %company.symbol, error = %e, "news fetch failed");
            (Vec::new(), Some(NEWS_FAILED))
        }
    };

    let template = NewsTemplate {
        symbol: &company.symbol,
        articles: &articles,
        error,
    };
    render_view(&headers, "News", &template)
}

#[derive(Debug, Default, Deserialize)]
pub struct ParamsQuery {
    #[serde(default)]
    pub strategy: String,
}

/// Parameter inputs for the selected strategy kind.
pub async fn strategy_params(
    headers: HeaderMap,
    Query(query): Query<ParamsQuery>,
) -> Result<Response, WebError> {
    let kind = if query.strategy.trim().is_empty() {
        StrategyKind::default()
    } else {
        query.strategy.parse()?
    };
    render_view(
        &headers,
        kind.label(),
        &StrategyParamsTemplate {
            params: param_inputs(kind),
        },
    )
}

pub async fn symbol_backtest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<SymbolQuery>,
    Form(form): Form<SymbolBacktestForm>,
) -> Result<Response, WebError> {
    let company = company_or_404(id, query.symbol.as_deref(), query.name.as_deref())?;
    let request = form.validate()?;
    info!(symbol = %company.symbol, strategy = %request.strategy, "running symbol backtest");

    match state.api.run_symbol_backtest(&company.symbol, &request).await {
        Ok(report) => {
            let equity_svg = render_chart(&equity_chart(&report.equity_curve));
            let template = SymbolBacktestTemplate::new(&report.summary, &equity_svg, &report.trades);
            render_view(&headers, "Backtest Result", &template)
        }
        Err(e) => {
            warn!(symbol = %company.symbol, error = %e, "symbol backtest failed");
            notice(&headers, &e.user_message(), true)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricQuery {
    pub metric: Option<String>,
}

pub async fn fundamentals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<MetricQuery>,
) -> Result<Response, WebError> {
    let company_name = lookup_company(id, None, None)
        .map(|c| c.name)
        .unwrap_or_else(|| format!("Company {id}"));

    let rows = state.api.fundamentals(id).await.unwrap_or_else(|e| {
        warn!(company_id = id, error = %e, "fundamentals fetch failed");
        Vec::new()
    });

    let Some(selected) = select_metric(&rows, query.metric.as_deref()) else {
        let template = FundamentalsTemplate {
            company_id: id,
            company_name: &company_name,
            metrics: Vec::new(),
            chart_svg: "",
            rows: Vec::new(),
            message: Some(NO_FUNDAMENTALS),
        };
        return render_view(&headers, "Fundamentals", &template);
    };

    let chart_svg = render_chart(&fundamentals_chart(&selected, &rows));
    let title = format!("{company_name} {}", display_metric(&selected));
    let template = FundamentalsTemplate {
        company_id: id,
        company_name: &company_name,
        metrics: metric_options(&metric_names(&rows), &selected),
        chart_svg: &chart_svg,
        rows: metric_series(&rows, &selected).into_iter().map(MetricRow::new).collect(),
        message: None,
    };
    render_view(&headers, &title, &template)
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    pub template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StrategyForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: String,
}

async fn strategies_view(
    state: &AppState,
    headers: &HeaderMap,
    selected_template: Option<&str>,
    form: &StrategyForm,
    flash: Option<&str>,
) -> Result<Response, WebError> {
    let (strategies, error) = match state.api.list_strategies().await {
        Ok(list) => (list.iter().map(StrategyRow::new).collect(), None),
        Err(e) => {
            warn!(error = %e, "strategy list fetch failed");
            (Vec::new(), Some(STRATEGIES_FAILED))
        }
    };
    let template = StrategiesTemplate {
        templates: template_options(&strategy_templates(), selected_template),
        name: &form.name,
        description: &form.description,
        parameters: &form.parameters,
        strategies,
        error,
        flash,
    };
    render_view(headers, "Strategies", &template)
}

pub async fn strategies(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TemplateQuery>,
) -> Result<Response, WebError> {
    let chosen = query.template.as_deref().and_then(find_template);
    let form = match &chosen {
        Some(t) => StrategyForm {
            name: t.name.to_string(),
            description: t.description.to_string(),
            parameters: t.parameters_pretty(),
        },
        None => StrategyForm::default(),
    };
    strategies_view(&state, &headers, chosen.as_ref().map(|t| t.name), &form, None).await
}

pub async fn create_strategy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<StrategyForm>,
) -> Result<Response, WebError> {
    let new = NewStrategy::from_form(&form.name, &form.description, &form.parameters)?;
    match state.api.create_strategy(&new).await {
        Ok(created) => {
            info!(id = created.id, name = %created.name, "strategy created");
            let flash = format!("Strategy \"{}\" saved", created.name);
            strategies_view(&state, &headers, None, &StrategyForm::default(), Some(&flash)).await
        }
        Err(e) => {
            warn!(error = %e, "strategy create failed");
            let flash = format!("Failed to save strategy: {}", e.user_message());
            strategies_view(&state, &headers, None, &form, Some(&flash)).await
        }
    }
}

pub async fn backtest_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, WebError> {
    let (strategies, top) = tokio::join!(state.api.list_strategies(), state.api.top_companies());

    let (strategies, strategies_error) = match strategies {
        Ok(list) => (list, None),
        Err(e) => {
            warn!(error = %e, "strategy list fetch failed");
            (Vec::new(), Some(STRATEGIES_FAILED))
        }
    };
    let top_companies = top.unwrap_or_else(|e| {
        warn!(error = %e, "top companies fetch failed");
        Vec::new()
    });

    let template = BacktestFormTemplate {
        strategies: &strategies,
        strategies_error,
        top_companies: &top_companies,
        first_company: top_companies.first().map(|c| c.company_id),
        initial_capital: format_number(DEFAULT_INITIAL_CAPITAL),
        roe_min: format_number(DEFAULT_ROE_MIN),
    };
    render_view(&headers, "Backtest", &template)
}

#[derive(Debug, Default, Deserialize)]
pub struct RoeQuery {
    #[serde(default)]
    pub roe_min: String,
    #[serde(default)]
    pub step: String,
}

/// The ROE stepper: `step=up` adds one, `step=down` subtracts one while the
/// value stays above 1.
pub async fn roe_field(headers: HeaderMap, Query(query): Query<RoeQuery>) -> Result<Response, WebError> {
    let roe = query
        .roe_min
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(DEFAULT_ROE_MIN);
    let roe = match query.step.as_str() {
        "up" => roe_step_up(roe),
        "down" => roe_step_down(roe),
        _ => roe,
    };
    render_view(
        &headers,
        "ROE",
        &RoeFieldTemplate {
            roe_min: format_number(roe),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct PnlQuery {
    pub company_id: i64,
}

pub async fn monthly_pnl(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PnlQuery>,
) -> Result<Response, WebError> {
    match state.api.monthly_pnl(query.company_id).await {
        Ok(pnl) => {
            let chart = monthly_pnl_chart(&pnl);
            if chart.is_empty() {
                return notice(&headers, NO_DATA, false);
            }
            let chart_svg = render_chart(&chart);
            render_view(&headers, "Monthly P&L", &ChartTemplate { chart_svg: &chart_svg })
        }
        Err(e) => {
            warn!(company_id = query.company_id, error = %e, "monthly pnl fetch failed");
            notice(&headers, NO_DATA, false)
        }
    }
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<BacktestForm>,
) -> Result<Response, WebError> {
    let request = form.validate()?;
    info!(
        strategy_id = request.strategy_id,
        start = %request.start_date,
        end = %request.end_date,
        "running portfolio backtest"
    );

    let report = match state.api.run_backtest(&request).await {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "portfolio backtest failed");
            return notice(&headers, &e.user_message(), true);
        }
    };

    let equity_svg = render_chart(&equity_chart(&report.equity_curve));
    let allocation_svg = render_chart(&allocation_chart(&report.allocation_history));
    let template = BacktestResultTemplate {
        report: &report,
        equity_svg: &equity_svg,
        allocation_svg: &allocation_svg,
        download_id: report.backtest_id,
    };
    let response = render_view(&headers, "Backtest Result", &template)?;
    state.results.insert(report);
    Ok(response)
}

fn download(state: &AppState, id: i64, format: ExportFormat) -> Result<Response, WebError> {
    let report = state
        .results
        .get(id)
        .ok_or_else(|| WebError::not_found(format!("Backtest {id} is no longer available")))?;
    let export = format.render(&report)?;
    let headers = [
        (header::CONTENT_TYPE, export.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    Ok((headers, export.body).into_response())
}

pub async fn download_json(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<Response, WebError> {
    download(&state, id, ExportFormat::Json)
}

pub async fn download_csv(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<Response, WebError> {
    download(&state, id, ExportFormat::Csv)
}

pub async fn not_found() -> WebError {
    WebError::not_found("Page not found")
}
