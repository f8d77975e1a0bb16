pub mod broadcast;
pub mod config;
pub mod connections;
pub mod countdown;
pub mod error;
pub mod health;
pub mod room_manager;
pub mod room_store;
pub mod state;
pub mod ws;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let cors = build_cors_layer(config.allowed_origin.as_deref());
    let state = AppState::new(config);

    let app = Router::new()
        .route("/health", axum::routing::get(health::health_check))
        .route("/ws", axum::routing::get(ws::ws_handler))
        .layer(cors)
        .with_state(state.clone());

    (app, state)
}

/// Allow the configured origin, or any origin when none is set.
fn build_cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allowed_origin.map(str::parse::<HeaderValue>) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Ignoring unparsable allowed_origin");
            layer.allow_origin(Any)
        },
        None => layer.allow_origin(Any),
    }
}
