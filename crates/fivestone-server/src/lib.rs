pub mod config;
pub mod error;
pub mod health;
pub mod room_manager;
pub mod state;
pub mod ws;

use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    // Browser clients connect from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}

/// Background task that periodically sweeps expired empty rooms. Empty
/// rooms are deleted synchronously on last leave, so this is a safety net
/// for rooms orphaned by missed cleanup.
pub fn spawn_room_sweeper(state: AppState) {
    let interval = Duration::from_secs(state.config.rooms.sweep_interval_secs);
    let max_age = Duration::from_secs(state.config.rooms.idle_timeout_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let mut rooms = state.rooms.write().await;
            let removed = rooms.cleanup_idle_rooms(max_age);
            if removed > 0 {
                tracing::info!(removed, "Room sweep removed expired rooms");
                rooms.broadcast_room_list();
            }
        }
    });
}
