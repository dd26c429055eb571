use crate::handlers::{diagnostics, get_room, health_check, list_rooms, ready_check};
use crate::AppState;
use axum::{routing::get, Router};

/// Create API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/rooms", get(list_rooms))
        .route("/v1/rooms/:name", get(get_room))
        .route("/v1/diagnostics", get(diagnostics))
}
