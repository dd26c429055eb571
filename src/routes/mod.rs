pub mod api;

use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::websocket::handler::{upgrade_any_path, websocket_handler};
use crate::AppState;
use api::create_api_routes;

/// Build the whole application: the API under `/api`, Swagger UI, and the
/// room WebSocket endpoint. Upgrade requests reach a room on any path.
pub fn create_app_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes())
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Any other path is a room
        .fallback(websocket_handler)
        .layer(middleware::from_fn_with_state(state.clone(), upgrade_any_path))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.allowed_origins();
    if config.is_development() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
