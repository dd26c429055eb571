use axum::{extract::State, Json};
use crate::models::{HealthResponse, ReadyResponse};
use crate::AppState;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(state): State<AppState>) -> Json<ReadyResponse> {
    debug!("Readiness check requested");
    // Everything lives in memory, so being able to read the room table is enough.
    Json(ReadyResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        rooms: state.hub.rooms().room_count() as u32,
    })
}
