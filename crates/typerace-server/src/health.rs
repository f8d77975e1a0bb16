use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    pub rooms: RoomInfo,
}

#[derive(Serialize)]
pub struct RoomInfo {
    pub active: usize,
    pub participants: usize,
}

/// Returns server status, live connections and room totals as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = {
        let rooms = state.rooms.read().await;
        rooms.stats()
    };

    Json(HealthResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        connections: stats.connections,
        rooms: RoomInfo {
            active: stats.rooms,
            participants: stats.participants,
        },
    })
}
