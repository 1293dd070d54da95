use chrono::{DateTime, Utc};
use ridehub_core::ReservationId;
use thiserror::Error;

use crate::types::ReservationStatus;

/// Errors raised by the booking state machine and the reservation store.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The requested status change is not an edge of the transition table.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Drivers can only be assigned to pending or confirmed reservations.
    #[error("reservation in status {status} cannot be assigned a driver")]
    NotAssignable { status: ReservationStatus },

    /// An active ride's driver cannot be pulled.
    #[error("cannot unassign the driver of a ride in progress")]
    CannotUnassignInProgress,

    /// `Assigned` and `InProgress` require a driver on the reservation.
    #[error("status {to} requires an assigned driver")]
    DriverRequired { to: ReservationStatus },

    /// Pickup time outside the years 0000-9999 the store can order correctly.
    #[error("scheduled_at {scheduled_at} is outside the supported range (years 0000-9999)")]
    ScheduleOutOfRange { scheduled_at: DateTime<Utc> },

    /// No reservation with the given id exists in the store.
    #[error("reservation not found: {id}")]
    NotFound { id: ReservationId },

    /// The row changed status between read and write.
    #[error("reservation {id} changed status concurrently: expected {expected}, found {actual}")]
    StatusConflict {
        id: ReservationId,
        expected: ReservationStatus,
        actual: ReservationStatus,
    },

    /// Underlying SQLite / rusqlite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Anything else the store could not complete (bad row data, worker panics).
    #[error("storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// Short error code string returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            BookingError::NotAssignable { .. } => "NOT_ASSIGNABLE",
            BookingError::CannotUnassignInProgress => "CANNOT_UNASSIGN_IN_PROGRESS",
            BookingError::DriverRequired { .. } => "DRIVER_REQUIRED",
            BookingError::ScheduleOutOfRange { .. } => "SCHEDULE_OUT_OF_RANGE",
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::StatusConflict { .. } => "STATUS_CONFLICT",
            BookingError::Database(_) => "DATABASE_ERROR",
            BookingError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// True for rule violations the caller caused, as opposed to storage faults.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidTransition { .. }
                | BookingError::NotAssignable { .. }
                | BookingError::CannotUnassignInProgress
                | BookingError::DriverRequired { .. }
                | BookingError::ScheduleOutOfRange { .. }
                | BookingError::StatusConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
