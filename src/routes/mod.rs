use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::build_cors_layer;
use crate::middleware::request_id::inject_request_id;
use crate::state::AppState;

pub mod health;
pub mod quotations;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(quotations::router())
}

/// Full application router with every layer except rate limiting, which
/// needs the peer address and is added by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest(&state.config.api_prefix, v1_router())
        .layer(DefaultBodyLimit::max(state.config.request_body_limit_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(state.config.request_timeout_seconds),
        ))
        .layer(axum::middleware::from_fn(inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config))
        .with_state(state)
}
