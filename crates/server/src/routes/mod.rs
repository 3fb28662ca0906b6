pub mod agent;
pub mod hcps;
pub mod interactions;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::health;
use crate::state::AppState;

/// Full HTTP surface: agent, CRUD and health routes behind the CORS allow-list.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let db_pool = state.db_pool.clone();

    Router::new()
        .merge(agent::router())
        .merge(hcps::router())
        .merge(interactions::router())
        .with_state(state)
        .merge(health::router(db_pool))
        .layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(event_name = "system.cors.invalid_origin", origin = %origin, "origin skipped");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
