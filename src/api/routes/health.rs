//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready once a provider API key is configured. The backend is not checked
/// here; it is per-user and a blip there should not pull the pod.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.provider.is_configured() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider_ok = state.provider.is_configured();
    let backend_ok = state.backend.health_check().await.is_ok();

    let overall_status = match (provider_ok, backend_ok) {
        (true, true) => "healthy",
        (false, false) => "unhealthy",
        _ => "degraded",
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        provider: if provider_ok { "configured" } else { "not_configured" }.to_string(),
        backend: if backend_ok { "ok" } else { "unreachable" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
