#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::{Value, json};
use trademo::adapters::web::{AppState, build_router};
use trademo::domain::backtest::{
    BacktestReport, BacktestRequest, MonthlyPnl, SymbolBacktestReport, SymbolBacktestRequest,
};
use trademo::domain::company::{CompanyRecord, SearchHit, TopCompany};
use trademo::domain::error::DashError;
use trademo::domain::fundamental::Fundamental;
use trademo::domain::news::{NewsArticle, NewsFeed};
pub use trademo::domain::price::PriceBar;
use trademo::domain::strategy::{NewStrategy, StrategyDef};
use trademo::ports::market_api::MarketApi;

/// In-memory backend. Endpoints named in `failures` answer with a backend
/// error carrying the given detail.
#[derive(Default)]
pub struct MockMarketApi {
    pub companies: Vec<CompanyRecord>,
    pub top: Vec<TopCompany>,
    pub pnl: HashMap<i64, MonthlyPnl>,
    pub prices: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<i64, Vec<Fundamental>>,
    pub strategies: Mutex<Vec<StrategyDef>>,
    pub backtest: Option<Value>,
    pub symbol_backtest: Option<SymbolBacktestReport>,
    pub search: HashMap<String, SearchHit>,
    pub news: HashMap<String, NewsFeed>,
    pub failures: HashMap<&'static str, (u16, String)>,
    pub last_backtest: Mutex<Option<BacktestRequest>>,
}

impl MockMarketApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, key: &str, bars: Vec<PriceBar>) -> Self {
        self.prices.insert(key.to_string(), bars);
        self
    }

    pub fn with_fundamentals(mut self, company_id: i64, rows: Vec<Fundamental>) -> Self {
        self.fundamentals.insert(company_id, rows);
        self
    }

    pub fn with_strategy(self, id: i64, name: &str) -> Self {
        self.strategies
            .lock()
            .unwrap()
            .push(strategy(id, name));
        self
    }

    pub fn with_top(mut self, company_id: i64, name: &str) -> Self {
        self.top.push(TopCompany {
            company_id,
            name: name.to_string(),
            symbol: None,
        });
        self
    }

    pub fn with_pnl(mut self, company_id: i64, dates: &[&str], returns: &[f64]) -> Self {
        self.pnl.insert(
            company_id,
            MonthlyPnl {
                dates: dates.iter().map(|d| d.to_string()).collect(),
                returns: returns.to_vec(),
            },
        );
        self
    }

    pub fn with_backtest(mut self, raw: Value) -> Self {
        self.backtest = Some(raw);
        self
    }

    pub fn with_symbol_backtest(mut self, report: SymbolBacktestReport) -> Self {
        self.symbol_backtest = Some(report);
        self
    }

    pub fn with_search(mut self, query: &str, hit: SearchHit) -> Self {
        self.search.insert(query.to_string(), hit);
        self
    }

    pub fn with_news(mut self, symbol: &str, articles: Vec<NewsArticle>) -> Self {
        self.news.insert(
            symbol.to_string(),
            NewsFeed {
                symbol: symbol.to_string(),
                count: articles.len(),
                news: articles,
            },
        );
        self
    }

    pub fn with_failure(mut self, endpoint: &'static str, status: u16, detail: &str) -> Self {
        self.failures.insert(endpoint, (status, detail.to_string()));
        self
    }

    fn check(&self, endpoint: &str) -> Result<(), DashError> {
        match self.failures.get(endpoint) {
            Some((status, detail)) => Err(DashError::Backend {
                status: *status,
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketApi for MockMarketApi {
    async fn list_companies(&self) -> Result<Vec<CompanyRecord>, DashError> {
        self.check("companies")?;
        Ok(self.companies.clone())
    }

    async fn top_companies(&self) -> Result<Vec<TopCompany>, DashError> {
        self.check("top10")?;
        Ok(self.top.clone())
    }

    async fn monthly_pnl(&self, company_id: i64) -> Result<MonthlyPnl, DashError> {
        self.check("monthly_pnl")?;
        self.pnl.get(&company_id).cloned().ok_or_else(|| DashError::Backend {
            status: 404,
            detail: "Company not found".into(),
        })
    }

    async fn prices(&self, key: &str) -> Result<Vec<PriceBar>, DashError> {
        self.check("prices")?;
        Ok(self.prices.get(key).cloned().unwrap_or_default())
    }

    async fn fundamentals(&self, company_id: i64) -> Result<Vec<Fundamental>, DashError> {
        self.check("fundamentals")?;
        Ok(self.fundamentals.get(&company_id).cloned().unwrap_or_default())
    }

    async fn list_strategies(&self) -> Result<Vec<StrategyDef>, DashError> {
        self.check("strategies")?;
        Ok(self.strategies.lock().unwrap().clone())
    }

    async fn create_strategy(&self, new: &NewStrategy) -> Result<StrategyDef, DashError> {
        self.check("create_strategy")?;
        let mut list = self.strategies.lock().unwrap();
        let created = StrategyDef {
            id: list.len() as i64 + 1,
            name: new.name.clone(),
            description: Some(new.description.clone()),
            created_at: Some("2024-06-01T00:00:00".into()),
            parameters: new.parameters.clone(),
        };
        list.push(created.clone());
        Ok(created)
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestReport, DashError> {
        self.check("run")?;
        *self.last_backtest.lock().unwrap() = Some(request.clone());
        let raw = self
            .backtest
            .clone()
            .unwrap_or_else(|| json!({"message": "No trades", "metrics": {}}));
        Ok(BacktestReport::from_json(raw))
    }

    async fn run_symbol_backtest(
        &self,
        _symbol: &str,
        _request: &SymbolBacktestRequest,
    ) -> Result<SymbolBacktestReport, DashError> {
        self.check("symbol_backtest")?;
        Ok(self.symbol_backtest.clone().unwrap_or_default())
    }

    async fn search_symbol(&self, query: &str) -> Result<Option<SearchHit>, DashError> {
        self.check("search")?;
        Ok(self.search.get(query).cloned())
    }

    async fn news(&self, symbol: &str) -> Result<NewsFeed, DashError> {
        self.check("news")?;
        Ok(self.news.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn strategy(id: i64, name: &str) -> StrategyDef {
    StrategyDef {
        id,
        name: name.to_string(),
        description: Some(format!("{name} description")),
        created_at: None,
        parameters: json!({"roe_min": 15}),
    }
}

pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: date.to_string(),
        open: close - 1.0,
        high: close + 2.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

pub fn make_fundamental(company_id: i64, date: &str, metric: &str, value: f64) -> Fundamental {
    Fundamental {
        id: 0,
        company_id,
        date: date.to_string(),
        metric: metric.to_string(),
        value: Some(value),
    }
}

pub fn article(title: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        link: "https://news.example.com/a".to_string(),
        source: "Example Wire".to_string(),
        time: "2 hours ago".to_string(),
    }
}

/// A backtest result with id 42, two metrics, a three-point equity curve
/// and two allocation snapshots.
pub fn sample_backtest() -> Value {
    json!({
        "backtest_id": 42,
        "strategy_id": 1,
        "metrics": {"CAGR": 0.12, "Sharpe": 1.4},
        "equity_curve": {
            "dates": ["2024-01-01", "2024-04-01", "2024-07-01"],
            "values": [100000.0, 104000.0, 110500.0]
        },
        "allocation_history": [
            {"date": "2024-01-01", "allocations": {"1": 0.6, "2": 0.4}},
            {"date": "2024-04-01", "allocations": {"1": 0.5, "2": 0.5}}
        ]
    })
}

pub fn test_router(api: MockMarketApi) -> Router {
    test_router_with_cache(api, 4)
}

pub fn test_router_with_cache(api: MockMarketApi, cache_size: usize) -> Router {
    build_router(AppState::new(Arc::new(api), cache_size), "static")
}
