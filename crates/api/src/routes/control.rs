use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use common::EngineStatus;
use strategy::{IndicatorPeriods, StrategyConfig};

use crate::{ApiError, AppState};

pub fn control_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/parameters", get(get_parameters))
        .route("/save-config", post(save_config))
        .route("/reload-config", post(reload_config))
        .route("/end", post(end))
}

async fn get_status(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.handle.status().await)
}

fn parameters(config: &StrategyConfig) -> Value {
    json!({
        "current_parameters": config,
        "derived_periods": IndicatorPeriods::from_window(config.indicator_window),
    })
}

async fn get_parameters(State(state): State<AppState>) -> Json<Value> {
    Json(parameters(&state.handle.config().await))
}

/// Validates every field; an invalid candidate leaves the config in effect
/// untouched and comes back as 400 with the full list of violations.
async fn save_config(
    State(state): State<AppState>,
    Json(candidate): Json<StrategyConfig>,
) -> Result<Json<Value>, ApiError> {
    let advisories = state.handle.save_config(candidate).await?;
    let current = state.handle.config().await;
    Ok(Json(json!({
        "message": "Configuration saved",
        "current_parameters": current,
        "advisories": advisories,
    })))
}

async fn reload_config(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let config = state.handle.reload_config().await?;
    let mut body = parameters(&config);
    body["message"] = json!("Configuration reloaded");
    Ok(Json(body))
}

async fn end(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("Shutdown requested via API");
    state.handle.stop();
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Shutdown initiated" })),
    )
}
