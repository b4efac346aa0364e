//! The full HTTP surface (spec §6): two chat routes and a health probe.

pub mod chat;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/health", get(health::health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
