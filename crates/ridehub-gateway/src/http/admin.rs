//! Operator endpoints for the booking scheduler.
//!
//! Guarded by `gateway.admin_token` when it is set; open otherwise.

use axum::{extract::State, http::HeaderMap, Json};
use ridehub_scheduler::{SchedulerStats, TickReport};
use std::sync::Arc;

use super::error::ApiError;
use crate::app::AppState;

/// GET /admin/scheduler/stats
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SchedulerStats>, ApiError> {
    if !check_auth(&state, &headers) {
        return Err(ApiError::Unauthorized);
    }
    let stats = state
        .engine
        .scheduler_stats(state.scheduler.as_ref())
        .await?;
    Ok(Json(stats))
}

/// POST /admin/scheduler/tick — run one tick now, outside the timer.
///
/// Pass failures are reported inside the returned `errors` list, so this
/// always answers 200 once authorised.
pub async fn tick_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TickReport>, ApiError> {
    if !check_auth(&state, &headers) {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(state.engine.process_scheduled_bookings().await))
}

fn check_auth(state: &AppState, headers: &HeaderMap) -> bool {
    match &state.config.gateway.admin_token {
        None => true,
        Some(expected) => extract_bearer(headers)
            .map(|t| t == expected.as_str())
            .unwrap_or(false),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
