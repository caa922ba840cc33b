//! HTTP error responses for web adapter.

use askama::Template;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, warn};

use crate::domain::error::DashError;

use super::is_htmx_request;
use super::templates::{BasePage, ErrorTemplate};

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

/// Marker left on error responses so [`full_page_errors`] can wrap them.
#[derive(Debug, Clone)]
struct ErrorFragment {
    status: StatusCode,
    html: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &DashError) -> StatusCode {
    match err {
        DashError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        DashError::Backend { status: 404, .. } => StatusCode::NOT_FOUND,
        DashError::Backend { .. } | DashError::Transport { .. } | DashError::Decode { .. } => {
            StatusCode::BAD_GATEWAY
        }
        DashError::ConfigParse { .. }
        | DashError::ConfigMissing { .. }
        | DashError::ConfigInvalid { .. }
        | DashError::Export { .. }
        | DashError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DashError> for WebError {
    fn from(err: DashError) -> Self {
        Self::new(status_from_error(&err), err.user_message())
    }
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        error!(error = %err, "template render failed");
        Self::internal("Failed to render page")
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), message = %self.message, "request failed");
        } else {
            warn!(status = self.status.as_u16(), message = %self.message, "request rejected");
        }
        let template = ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        let html = match template.render() {
            Ok(html) => html,
            Err(_) => return (self.status, self.message).into_response(),
        };
        let mut response = (self.status, Html(html.clone())).into_response();
        response.extensions_mut().insert(ErrorFragment {
            status: self.status,
            html,
        });
        response
    }
}

/// Serve error fragments as full pages to non-htmx clients.
pub async fn full_page_errors(request: Request, next: Next) -> Response {
    let htmx = is_htmx_request(request.headers());
    let mut response = next.run(request).await;
    let Some(fragment) = response.extensions_mut().remove::<ErrorFragment>() else {
        return response;
    };
    if htmx {
        return response;
    }
    let page = BasePage {
        title: "Error",
        content: &fragment.html,
    };
    match page.render() {
        Ok(html) => (fragment.status, Html(html)).into_response(),
        Err(_) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status() {
        assert_eq!(
            status_from_error(&DashError::invalid_input("Fill all fields properly")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_from_error(&DashError::Backend {
                status: 404,
                detail: "Company not found".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_from_error(&DashError::Transport {
                url: "http://x".into(),
                reason: "refused".into()
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn backend_detail_becomes_message() {
        let err: WebError = DashError::Backend {
            status: 400,
            detail: "No price data in selected period".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "No price data in selected period");
    }

    #[test]
    fn response_carries_status_and_fragment() {
        let response = WebError::not_found("Page not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorFragment>().is_some());
    }
}
