use crate::services::store::StoreMode;
use crate::state::AppState;
use axum::{Json, extract::State};
use chrono::Utc;
use tongate_protocol::{HealthResponse, StatusResponse};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let mode = match state.store.mode() {
        StoreMode::Live => "production",
        StoreMode::Demo => "demo",
    };
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        mode: mode.to_string(),
        recipient_wallet: state.config.recipient_wallet.clone(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let database = match state.store.mode() {
        StoreMode::Live => "connected",
        StoreMode::Demo => "demo",
    };
    Json(StatusResponse {
        server: "online".to_string(),
        database: database.to_string(),
        telegram: state.bot.status(),
        gateway: state.gateway.status(),
        recipient_wallet: state.config.recipient_wallet.clone(),
    })
}
