use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reelmatch_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Probes the store and, when configured, the catalog cache.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = vec![HealthCheck::probe("store", state.store.ping().await)];
    checks.push(match &state.redis {
        Some(redis) => HealthCheck::probe("catalog_cache", redis.ping().await),
        None => HealthCheck::disabled("catalog_cache"),
    });

    let response = HealthResponse::healthy("reelmatch-rooms", env!("CARGO_PKG_VERSION"))
        .with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
