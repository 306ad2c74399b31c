use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{ApiError, AppState};

const RECENT_POINTS: u32 = 100;

pub fn market_router() -> Router<AppState> {
    Router::new().route("/market-data", get(get_market_data))
}

/// The latest stored price samples with their indicators, oldest first.
async fn get_market_data(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let data = state.market_data.recent(RECENT_POINTS).await?;
    let total_available = state.market_data.count().await?;

    Ok(Json(json!({
        "count": data.len(),
        "total_available": total_available,
        "data": data,
    })))
}
