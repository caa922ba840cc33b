//! Web server adapter.
//!
//! Axum server with an htmx frontend for browsing companies, running
//! backtests and downloading their results. Every view renders as a
//! fragment for htmx requests and as a full page otherwise.

mod error;
mod extract;
mod handlers;
mod result_cache;
mod templates;

pub use error::WebError;
pub use result_cache::ResultCache;

use std::path::Path;
use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    http::HeaderMap,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::ports::market_api::MarketApi;

use templates::BasePage;

pub struct AppState {
    pub api: Arc<dyn MarketApi>,
    pub results: ResultCache,
}

impl AppState {
    pub fn new(api: Arc<dyn MarketApi>, result_cache_size: usize) -> Self {
        Self {
            api,
            results: ResultCache::new(result_cache_size),
        }
    }
}

pub fn build_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/companies", get(handlers::companies))
        .route("/companies/{id}", get(handlers::company_detail))
        .route("/companies/{id}/news", get(handlers::company_news))
        .route("/companies/{id}/backtest", post(handlers::symbol_backtest))
        .route("/prices/{id}", get(handlers::price_overview))
        .route("/fundamentals/{id}", get(handlers::fundamentals))
        .route(
            "/strategies",
            get(handlers::strategies).post(handlers::create_strategy),
        )
        .route("/backtest", get(handlers::backtest_form))
        .route("/backtest/params", get(handlers::strategy_params))
        .route("/backtest/roe", get(handlers::roe_field))
        .route("/backtest/pnl", get(handlers::monthly_pnl))
        .route("/backtest/run", post(handlers::run_backtest))
        .route("/backtest/{id}/download.json", get(handlers::download_json))
        .route("/backtest/{id}/download.csv", get(handlers::download_csv))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(error::full_page_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// htmx sets `HX-Request` on every request it makes, including history
/// restores, which need the full page.
fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("HX-Request").is_some() && headers.get("HX-History-Restore-Request").is_none()
}

/// Id of the element an htmx request will swap into.
fn htmx_target(headers: &HeaderMap) -> Option<&str> {
    headers.get("HX-Target").and_then(|v| v.to_str().ok())
}

/// Render `view` as a fragment, or inside the base layout for full-page loads.
fn render_view<T: Template>(headers: &HeaderMap, title: &str, view: &T) -> Result<Response, WebError> {
    let content = view.render()?;
    if is_htmx_request(headers) {
        return Ok(Html(content).into_response());
    }
    let page = BasePage {
        title,
        content: &content,
    };
    Ok(Html(page.render()?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn detects_htmx_requests() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx_request(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx_request(&headers));
        headers.insert("HX-History-Restore-Request", HeaderValue::from_static("true"));
        assert!(!is_htmx_request(&headers));
    }

    #[test]
    fn reads_htmx_target() {
        let mut headers = HeaderMap::new();
        assert_eq!(htmx_target(&headers), None);
        headers.insert("HX-Target", HeaderValue::from_static("company-grid"));
        assert_eq!(htmx_target(&headers), Some("company-grid"));
    }
}
