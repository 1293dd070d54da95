use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridehub_core::{DriverId, ReservationId, VehicleId};

use crate::error::Result;
use crate::types::{Reservation, ReservationStatus};

/// Selection criteria for [`ReservationStore::find_reservations`] and
/// [`ReservationStore::count_reservations`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFilter {
    /// Empty means any status.
    pub statuses: Vec<ReservationStatus>,
    /// `Some(true)` keeps only rows with a driver, `Some(false)` only rows without.
    pub driver_assigned: Option<bool>,
    /// Inclusive lower bound on `scheduled_at`.
    pub scheduled_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `scheduled_at`.
    pub scheduled_until: Option<DateTime<Utc>>,
}

impl ReservationFilter {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Self::default()
        }
    }

    pub fn statuses(statuses: &[ReservationStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_driver(mut self) -> Self {
        self.driver_assigned = Some(true);
        self
    }

    pub fn scheduled_until(mut self, until: DateTime<Utc>) -> Self {
        self.scheduled_until = Some(until);
        self
    }

    pub fn scheduled_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.scheduled_from = Some(from);
        self.scheduled_until = Some(until);
        self
    }
}

/// Narrow, id-scoped partial update.
///
/// The write only lands if the stored row still has `expected_status`;
/// otherwise the store reports `StatusConflict` (or `NotFound` when the row
/// is gone). Fields left as `None` are untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationPatch {
    pub expected_status: ReservationStatus,
    pub status: Option<ReservationStatus>,
    pub driver_id: Option<Option<DriverId>>,
    pub vehicle_id: Option<Option<VehicleId>>,
    pub cancellation_reason: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationPatch {
    /// The fields that differ between a stored reservation and the state
    /// machine's output for it.
    pub fn between(before: &Reservation, after: &Reservation) -> Self {
        fn changed<T: Clone + PartialEq>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }

        Self {
            expected_status: before.status,
            status: changed(&before.status, &after.status),
            driver_id: changed(&before.driver_id, &after.driver_id),
            vehicle_id: changed(&before.vehicle_id, &after.vehicle_id),
            cancellation_reason: changed(&before.cancellation_reason, &after.cancellation_reason),
            updated_at: after.updated_at,
        }
    }
}

/// Datastore contract consumed by the booking service and the scheduler.
///
/// Implementations must make `update_reservation` atomic per row: either the
/// whole patch lands or none of it does.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Matching reservations ordered by `scheduled_at`, then id.
    async fn find_reservations(&self, filter: &ReservationFilter) -> Result<Vec<Reservation>>;

    /// Fetch one reservation; `NotFound` if it does not exist.
    async fn get_reservation(&self, id: &ReservationId) -> Result<Reservation>;

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<()>;

    /// Apply `patch` to the row with `id` and return the stored result.
    async fn update_reservation(
        &self,
        id: &ReservationId,
        patch: &ReservationPatch,
    ) -> Result<Reservation>;

    async fn count_reservations(&self, filter: &ReservationFilter) -> Result<u64>;
}
