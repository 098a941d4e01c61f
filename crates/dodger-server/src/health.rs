use axum::Json;
use axum::extract::State;
use serde::Serialize;

use dodger_core::time::timestamp_now;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub timestamp: String,
    pub scores_stored: usize,
    pub players: usize,
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (scores_stored, players) = {
        let store = state.store.read().await;
        (store.score_count(), store.player_count())
    };

    Json(HealthResponse {
        status: "ok",
        service: state.config.share.game_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: timestamp_now(),
        scores_stored,
        players,
    })
}
