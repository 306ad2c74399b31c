use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ApiError, AppState};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

pub fn history_router() -> Router<AppState> {
    Router::new()
        .route("/history", get(get_history))
        .route("/trades", get(get_history))
}

#[derive(Deserialize)]
struct HistoryQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

/// Executed trades, most recent first.
async fn get_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = (page - 1).saturating_mul(limit);

    let trades = state.ledger.list(limit, offset).await?;
    let summary = state.ledger.summary().await?;

    Ok(Json(json!({
        "trades": trades,
        "summary": summary,
        "page": page,
        "limit": limit,
    })))
}
