use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe with build info and whether the booking
/// scheduler timer is running.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("RIDEHUB_GIT_SHA"),
        "scheduler_active": state.scheduler.as_ref().is_some_and(|h| h.is_active()),
    }))
}
