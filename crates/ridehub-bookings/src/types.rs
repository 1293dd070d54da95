use chrono::{DateTime, SubsecRound, Utc};
use ridehub_core::types::is_storable;
use ridehub_core::{DriverId, ReservationId, VehicleId};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// Lifecycle state of a ride reservation.
///
/// Stored and serialised in the upper-case form the booking site uses
/// (`PENDING`, `IN_PROGRESS`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Requested by a customer, not yet reviewed.
    Pending,
    /// Accepted; waiting for a driver.
    Confirmed,
    /// Driver (and usually vehicle) attached; waiting for pickup time.
    Assigned,
    /// Pickup time reached or driver started the ride.
    InProgress,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 6] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Assigned,
        ReservationStatus::InProgress,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Assigned => "ASSIGNED",
            ReservationStatus::InProgress => "IN_PROGRESS",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "ASSIGNED" => Ok(ReservationStatus::Assigned),
            "IN_PROGRESS" => Ok(ReservationStatus::InProgress),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// A persisted ride reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub status: ReservationStatus,
    /// Canonical pickup instant. The date/time strings shown in the UI are
    /// derived from this, see [`Reservation::scheduled_date`].
    pub scheduled_at: DateTime<Utc>,
    pub driver_id: Option<DriverId>,
    pub vehicle_id: Option<VehicleId>,
    /// Free-text reason recorded on cancellation.
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every status change; strictly increasing.
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Build a fresh `Pending` reservation from a booking request. The pickup
    /// time is cut to the microsecond precision the store keeps.
    pub fn new(request: NewReservation, now: DateTime<Utc>) -> Self {
        Self {
            id: ReservationId::new(),
            status: ReservationStatus::Pending,
            scheduled_at: request.scheduled_at.trunc_subsecs(6),
            driver_id: None,
            vehicle_id: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pickup date for display (`YYYY-MM-DD`, UTC).
    pub fn scheduled_date(&self) -> String {
        self.scheduled_at.format("%Y-%m-%d").to_string()
    }

    /// Pickup time of day for display (`HH:MM`, UTC).
    pub fn scheduled_time(&self) -> String {
        self.scheduled_at.format("%H:%M").to_string()
    }
}

/// Booking request as received from the booking site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub scheduled_at: DateTime<Utc>,
}

impl NewReservation {
    /// Refuse pickup times the store cannot keep in order.
    pub fn validate(&self) -> Result<()> {
        if is_storable(self.scheduled_at) {
            Ok(())
        } else {
            Err(BookingError::ScheduleOutOfRange {
                scheduled_at: self.scheduled_at,
            })
        }
    }
}
