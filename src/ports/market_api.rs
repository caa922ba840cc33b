//! The remote market-data and backtest backend, as seen by the dashboard.

use async_trait::async_trait;

use crate::domain::backtest::{
    BacktestReport, BacktestRequest, MonthlyPnl, SymbolBacktestReport, SymbolBacktestRequest,
};
use crate::domain::company::{CompanyRecord, SearchHit, TopCompany};
use crate::domain::error::DashError;
use crate::domain::fundamental::Fundamental;
use crate::domain::news::NewsFeed;
use crate::domain::price::PriceBar;
use crate::domain::strategy::{NewStrategy, StrategyDef};

#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn list_companies(&self) -> Result<Vec<CompanyRecord>, DashError>;

    async fn top_companies(&self) -> Result<Vec<TopCompany>, DashError>;

    async fn monthly_pnl(&self, company_id: i64) -> Result<MonthlyPnl, DashError>;

    /// `key` is either a company id or a ticker symbol; the backend accepts both.
    async fn prices(&self, key: &str) -> Result<Vec<PriceBar>, DashError>;

    async fn fundamentals(&self, company_id: i64) -> Result<Vec<Fundamental>, DashError>;

    async fn list_strategies(&self) -> Result<Vec<StrategyDef>, DashError>;

    async fn create_strategy(&self, strategy: &NewStrategy) -> Result<StrategyDef, DashError>;

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestReport, DashError>;

    async fn run_symbol_backtest(
        &self,
        symbol: &str,
        request: &SymbolBacktestRequest,
    ) -> Result<SymbolBacktestReport, DashError>;

    /// `Ok(None)` when the backend found nothing.
    async fn search_symbol(&self, query: &str) -> Result<Option<SearchHit>, DashError>;

    async fn news(&self, symbol: &str) -> Result<NewsFeed, DashError>;
}
