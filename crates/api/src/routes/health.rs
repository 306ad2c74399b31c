use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness check for ops scripts.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let status = state.handle.status().await;
    Json(json!({
        "status": "ok",
        "engine": status.status.to_string(),
        "mode": state.trading_mode.to_string(),
    }))
}
