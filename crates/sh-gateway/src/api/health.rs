//! `GET /health` (spec §6).

use axum::extract::State;
use axum::response::Json;

use sh_store::DocumentStore;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db = match state.store.find("health_check", serde_json::json!({})).await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };

    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.count(),
        "db": db,
    }))
}
