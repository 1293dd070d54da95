//! Reservation endpoints used by the booking site and the dispatch console.
//!
//! Every mutating route goes through [`BookingService`](ridehub_bookings::BookingService),
//! so illegal moves come back as 409 with the lifecycle error code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ridehub_bookings::{NewReservation, Reservation, ReservationStatus};
use ridehub_core::{DriverId, ReservationId, VehicleId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::app::AppState;

/// Reservation as returned over HTTP: the stored record plus display fields.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub scheduled_date: String,
    pub scheduled_time: String,
}

impl From<Reservation> for ReservationView {
    fn from(reservation: Reservation) -> Self {
        Self {
            scheduled_date: reservation.scheduled_date(),
            scheduled_time: reservation.scheduled_time(),
            reservation,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub driver_id: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// POST /reservations
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewReservation>,
) -> Result<(StatusCode, Json<ReservationView>), ApiError> {
    let created = state.bookings.create(req).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /reservations/{id}
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ReservationView> {
    let found = state.bookings.get(&ReservationId::from(id)).await?;
    Ok(Json(found.into()))
}

/// POST /reservations/{id}/status
pub async fn transition_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> ApiResult<ReservationView> {
    let updated = state
        .bookings
        .transition(&ReservationId::from(id), req.status)
        .await?;
    Ok(Json(updated.into()))
}

/// POST /reservations/{id}/assign
pub async fn assign_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<ReservationView> {
    let updated = state
        .bookings
        .assign_driver(
            &ReservationId::from(id),
            DriverId::from(req.driver_id),
            req.vehicle_id.map(VehicleId::from),
        )
        .await?;
    Ok(Json(updated.into()))
}

/// POST /reservations/{id}/unassign
pub async fn unassign_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ReservationView> {
    let updated = state
        .bookings
        .unassign_driver(&ReservationId::from(id))
        .await?;
    Ok(Json(updated.into()))
}

/// POST /reservations/{id}/cancel — body `{"reason": "..."}`; send `{}` for no reason.
pub async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<ReservationView> {
    let updated = state
        .bookings
        .cancel(&ReservationId::from(id), req.reason)
        .await?;
    Ok(Json(updated.into()))
}

/// POST /reservations/{id}/complete
pub async fn complete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ReservationView> {
    let updated = state.bookings.complete(&ReservationId::from(id)).await?;
    Ok(Json(updated.into()))
}
