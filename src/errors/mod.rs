/// Unified error handling and response translation
use crate::domain::{Outcome, RequestContext, UpstreamBody};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Client-visible error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required query parameter: {0}")]
    MissingParameter(&'static str),
    #[error("route not found")]
    UnknownRoute,
    #[error("upstream request timed out")]
    UpstreamTimeout,
    #[error("upstream responded with status {0}")]
    UpstreamNonSuccess(StatusCode),
    #[error("upstream network error: {0}")]
    UpstreamNetwork(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownRoute => StatusCode::NOT_FOUND,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::UpstreamNonSuccess(_) | ApiError::UpstreamNetwork(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to callers; upstream details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            ApiError::MissingParameter(_) | ApiError::UnknownRoute => self.to_string(),
            ApiError::UpstreamTimeout => "upstream request timed out".to_string(),
            ApiError::UpstreamNonSuccess(_) | ApiError::UpstreamNetwork(_) => {
                "upstream request failed".to_string()
            }
            ApiError::Internal(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("internal error: {}", detail);
        }
        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for UpstreamBody {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .and_then(|ct| HeaderValue::from_str(&ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type)],
            self.bytes,
        )
            .into_response()
    }
}

/// Turn a finished request into exactly one HTTP response
pub fn translate(ctx: RequestContext<'_>) -> Response {
    match ctx.outcome {
        Outcome::UpstreamSucceeded(body) => body.into_response(),
        Outcome::Rejected(err) | Outcome::UpstreamFailed(err) => err.into_response(),
        Outcome::Pending | Outcome::Validated(_) => ApiError::Internal(format!(
            "request for {} finished without an upstream outcome",
            ctx.route.name
        ))
        .into_response(),
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
