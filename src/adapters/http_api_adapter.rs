//! reqwest implementation of [`MarketApi`] against the JSON backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::backtest::{
    BacktestReport, BacktestRequest, MonthlyPnl, SymbolBacktestReport, SymbolBacktestRequest,
};
use crate::domain::company::{CompanyRecord, SearchHit, TopCompany};
use crate::domain::error::DashError;
use crate::domain::fundamental::Fundamental;
use crate::domain::news::NewsFeed;
use crate::domain::price::{PriceBar, PriceResponse};
use crate::domain::strategy::{NewStrategy, StrategyDef};
use crate::ports::market_api::MarketApi;
use crate::settings::Settings;

const USER_AGENT: &str = concat!("trademo/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpMarketApi {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpMarketApi {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, DashError> {
        if base_url.cannot_be_a_base() {
            return Err(DashError::ConfigInvalid {
                section: "backend".into(),
                key: "base_url".into(),
                reason: format!("{base_url} cannot be used as a base url"),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::Transport {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { base_url, http })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, DashError> {
        Self::new(settings.backend_url.clone(), settings.timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base url plus percent-encoded path segments. FastAPI collection routes
    /// are declared with a trailing slash, hence `trailing_slash`.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DashError> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode_response(&url, resp).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, DashError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "POST");
        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        decode_response(&url, resp).await
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> DashError {
    DashError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

async fn decode_response<T: DeserializeOwned>(url: &Url, resp: Response) -> Result<T, DashError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(|e| transport_error(url, e))?;
    if !status.is_success() {
        let detail = error_detail(status, &body);
        debug!(%url, status = status.as_u16(), %detail, "backend error");
        return Err(DashError::Backend {
            status: status.as_u16(),
            detail,
        });
    }
    serde_json::from_slice(&body).map_err(|e| DashError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Pull a human-readable message out of an error body. FastAPI puts it
/// under `detail`; validation errors make that an array.
pub fn error_detail(status: StatusCode, body: &[u8]) -> String {
    let from_body = serde_json::from_slice::<Value>(body).ok().and_then(|v| match v.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    });
    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}

#[async_trait]
impl MarketApi for HttpMarketApi {
    async fn list_companies(&self) -> Result<Vec<CompanyRecord>, DashError> {
        self.get_json(self.endpoint(&["companies"], true)).await
    }

    async fn top_companies(&self) -> Result<Vec<TopCompany>, DashError> {
        self.get_json(self.endpoint(&["companies", "top10"], false)).await
    }

    async fn monthly_pnl(&self, company_id: i64) -> Result<MonthlyPnl, DashError> {
        let id = company_id.to_string();
        self.get_json(self.endpoint(&["companies", id.as_str(), "monthly_pnl"], false))
            .await
    }

    async fn prices(&self, key: &str) -> Result<Vec<PriceBar>, DashError> {
        let resp: PriceResponse = self.get_json(self.endpoint(&["prices", key], false)).await?;
        Ok(resp.into_bars())
    }

    async fn fundamentals(&self, company_id: i64) -> Result<Vec<Fundamental>, DashError> {
        let id = company_id.to_string();
        self.get_json(self.endpoint(&["fundamentals", id.as_str()], false)).await
    }

    async fn list_strategies(&self) -> Result<Vec<StrategyDef>, DashError> {
        self.get_json(self.endpoint(&["strategies"], true)).await
    }

    async fn create_strategy(&self, strategy: &NewStrategy) -> Result<StrategyDef, DashError> {
        self.post_json(self.endpoint(&["strategies"], true), strategy)
            .await
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestReport, DashError> {
        let raw: Value = self.post_json(self.endpoint(&["run"], false), request).await?;
        Ok(BacktestReport::from_json(raw))
    }

    async fn run_symbol_backtest(
        &self,
        symbol: &str,
        request: &SymbolBacktestRequest,
    ) -> Result<SymbolBacktestReport, DashError> {
        self.post_json(self.endpoint(&["backtest", symbol], false), request)
            .await
    }

    async fn search_symbol(&self, query: &str) -> Result<Option<SearchHit>, DashError> {
        let url = self.endpoint(&["search", query], false);
        let raw: Value = match self.get_json(url.clone()).await {
            Ok(v) => v,
            Err(DashError::Backend { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        if raw.get("error").is_some_and(|e| !e.is_null()) {
            return Ok(None);
        }
        if raw.get("symbol").and_then(Value::as_str).is_none_or(|s| s.trim().is_empty()) {
            return Ok(None);
        }
        serde_json::from_value(raw).map(Some).map_err(|e| DashError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn news(&self, symbol: &str) -> Result<NewsFeed, DashError> {
        self.get_json(self.endpoint(&["news", symbol], false)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpMarketApi {
        HttpMarketApi::new(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoint_joins_segments() {
        let api = api("http://localhost:8000");
        assert_eq!(
            api.endpoint(&["companies"], true).as_str(),
            "http://localhost:8000/companies/"
        );
        assert_eq!(
            api.endpoint(&["companies", "3", "monthly_pnl"], false).as_str(),
            "http://localhost:8000/companies/3/monthly_pnl"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let api = api("https://example.com/api/");
        assert_eq!(api.endpoint(&["run"], false).as_str(), "https://example.com/api/run");
    }

    #[test]
    fn endpoint_encodes_symbols() {
        let api = api("http://localhost:8000");
        assert_eq!(
            api.endpoint(&["prices", "M&M.NS"], false).as_str(),
            "http://localhost:8000/prices/M&M.NS"
        );
        assert_eq!(
            api.endpoint(&["search", "tata motors"], false).as_str(),
            "http://localhost:8000/search/tata%20motors"
        );
        assert_eq!(
            api.endpoint(&["news", "a/b"], false).as_str(),
            "http://localhost:8000/news/a%2Fb"
        );
    }

    #[test]
    fn error_detail_prefers_body_detail() {
        let body = br#"{"detail": "No price data in selected period"}"#;
        assert_eq!(
            error_detail(StatusCode::BAD_REQUEST, body),
            "No price data in selected period"
        );
    }

    #[test]
    fn error_detail_serializes_structured_detail() {
        let body = br#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#;
        let detail = error_detail(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(detail.contains("field required"));
    }

    #[test]
    fn error_detail_falls_back_to_reason_phrase() {
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, b"<html>"), "Bad Gateway");
    }

    #[test]
    fn rejects_non_base_url() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(HttpMarketApi::new(url, Duration::from_secs(1)).is_err());
    }
}
