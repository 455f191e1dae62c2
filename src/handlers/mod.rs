/// HTTP request handlers
use crate::domain::{Health, RouteTable};
use crate::errors::{translate, ApiError};
use crate::services::GatewayService;
use axum::{
    extract::{MatchedPath, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub routes: Arc<RouteTable>,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Generic proxy handler, shared by every route in the table
pub async fn proxy(
    State(state): State<AppState>,
    matched: MatchedPath,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(route) = state.routes.resolve(matched.as_str()) else {
        return ApiError::UnknownRoute.into_response();
    };

    let ctx = state.gateway.proxy(route, params).await;
    translate(ctx)
}

/// Fallback for paths outside the route table
pub async fn not_found() -> ApiError {
    ApiError::UnknownRoute
}
