use std::sync::Arc;

use ridehub_core::types::now_utc;
use ridehub_core::{DriverId, ReservationId, VehicleId};
use tracing::{debug, info, instrument};

use crate::error::{BookingError, Result};
use crate::store::{ReservationPatch, ReservationStore};
use crate::types::{NewReservation, Reservation, ReservationStatus};

/// Manual booking operations invoked from request handlers.
///
/// Every method follows the same shape: load the reservation, run the state
/// machine on the in-memory copy, persist the difference with one guarded
/// write. Errors come back as structured [`BookingError`]s for the API layer
/// to translate.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn ReservationStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Record a new booking request as `Pending`.
    #[instrument(skip_all, fields(scheduled_at = %request.scheduled_at))]
    pub async fn create(&self, request: NewReservation) -> Result<Reservation> {
        request.validate()?;
        let reservation = Reservation::new(request, now_utc());
        self.store.insert_reservation(&reservation).await?;
        info!(reservation_id = %reservation.id, "reservation created");
        Ok(reservation)
    }

    pub async fn get(&self, id: &ReservationId) -> Result<Reservation> {
        self.store.get_reservation(id).await
    }

    /// Move a reservation to `target` if the transition table allows it.
    ///
    /// If a concurrent writer already moved the row to `target`, the call
    /// converges on that state instead of failing.
    #[instrument(skip_all, fields(reservation_id = %id, to = %target))]
    pub async fn transition(
        &self,
        id: &ReservationId,
        target: ReservationStatus,
    ) -> Result<Reservation> {
        let current = self.store.get_reservation(id).await?;
        let next = current.apply_transition(target, now_utc())?;
        match self.persist(&current, &next).await {
            Err(BookingError::StatusConflict { actual, .. }) if actual == target => {
                debug!("concurrent writer already applied the transition");
                self.store.get_reservation(id).await
            }
            other => other,
        }
    }

    #[instrument(skip_all, fields(reservation_id = %id, driver_id = %driver_id))]
    pub async fn assign_driver(
        &self,
        id: &ReservationId,
        driver_id: DriverId,
        vehicle_id: Option<VehicleId>,
    ) -> Result<Reservation> {
        let current = self.store.get_reservation(id).await?;
        let next = current.assign_driver(driver_id, vehicle_id, now_utc())?;
        self.persist(&current, &next).await
    }

    #[instrument(skip_all, fields(reservation_id = %id))]
    pub async fn unassign_driver(&self, id: &ReservationId) -> Result<Reservation> {
        let current = self.store.get_reservation(id).await?;
        let next = current.unassign_driver(now_utc())?;
        self.persist(&current, &next).await
    }

    #[instrument(skip_all, fields(reservation_id = %id))]
    pub async fn cancel(&self, id: &ReservationId, reason: Option<String>) -> Result<Reservation> {
        let current = self.store.get_reservation(id).await?;
        let next = current.cancel(reason, now_utc())?;
        self.persist(&current, &next).await
    }

    /// Close out a ride. Payment capture happens in the caller once this succeeds.
    #[instrument(skip_all, fields(reservation_id = %id))]
    pub async fn complete(&self, id: &ReservationId) -> Result<Reservation> {
        let current = self.store.get_reservation(id).await?;
        let next = current.complete(now_utc())?;
        self.persist(&current, &next).await
    }

    async fn persist(&self, before: &Reservation, after: &Reservation) -> Result<Reservation> {
        let patch = ReservationPatch::between(before, after);
        let stored = self.store.update_reservation(&before.id, &patch).await?;
        info!(
            reservation_id = %stored.id,
            from = %before.status,
            to = %stored.status,
            "reservation updated"
        );
        Ok(stored)
    }
}
