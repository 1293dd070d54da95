//! Booking state machine.
//!
//! [`ReservationStatus::can_transition`] is the single source of truth for
//! which status changes are legal. Every other operation here (assignment,
//! cancellation, completion) is expressed in terms of it and returns a new
//! [`Reservation`] value; nothing in this module touches storage.

use chrono::{DateTime, Utc};
use ridehub_core::types::next_after;
use ridehub_core::{DriverId, VehicleId};

use crate::error::{BookingError, Result};
use crate::types::{Reservation, ReservationStatus};

impl ReservationStatus {
    /// Statuses reachable from `self` in one step.
    pub fn allowed_next(&self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Assigned, Cancelled],
            Assigned => &[InProgress, Confirmed, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    /// Whether `self -> next` is an edge of the transition table.
    ///
    /// Self-transitions are never edges.
    pub fn can_transition(&self, next: ReservationStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// `Completed` and `Cancelled` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Statuses that require a driver on the reservation.
    pub fn requires_driver(&self) -> bool {
        matches!(self, ReservationStatus::Assigned | ReservationStatus::InProgress)
    }
}

/// Pure predicate over the transition table.
pub fn can_transition(current: ReservationStatus, next: ReservationStatus) -> bool {
    current.can_transition(next)
}

impl Reservation {
    /// Move to `next` if the table allows it.
    ///
    /// Returns the updated copy with a strictly newer `updated_at`. Going from
    /// `Assigned` back to `Confirmed` releases the driver and vehicle.
    pub fn apply_transition(&self, next: ReservationStatus, now: DateTime<Utc>) -> Result<Reservation> {
        if !self.status.can_transition(next) {
            return Err(BookingError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next.requires_driver() && self.driver_id.is_none() {
            return Err(BookingError::DriverRequired { to: next });
        }

        let mut updated = self.clone();
        if self.status == ReservationStatus::Assigned && next == ReservationStatus::Confirmed {
            updated.driver_id = None;
            updated.vehicle_id = None;
        }
        updated.status = next;
        updated.updated_at = next_after(self.updated_at, now);
        Ok(updated)
    }

    /// Attach a driver (and optionally a vehicle) and move to `Assigned`.
    ///
    /// Only `Pending` and `Confirmed` reservations are assignable. A pending
    /// reservation walks `Pending -> Confirmed -> Assigned` in one step.
    pub fn assign_driver(
        &self,
        driver_id: DriverId,
        vehicle_id: Option<VehicleId>,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let base = match self.status {
            ReservationStatus::Pending => self.apply_transition(ReservationStatus::Confirmed, now)?,
            ReservationStatus::Confirmed => self.clone(),
            status => return Err(BookingError::NotAssignable { status }),
        };

        let mut staged = base;
        staged.driver_id = Some(driver_id);
        staged.vehicle_id = vehicle_id;
        staged.apply_transition(ReservationStatus::Assigned, now)
    }

    /// Release the driver and vehicle, returning the booking to `Confirmed`.
    pub fn unassign_driver(&self, now: DateTime<Utc>) -> Result<Reservation> {
        match self.status {
            ReservationStatus::InProgress => Err(BookingError::CannotUnassignInProgress),
            ReservationStatus::Assigned => self.apply_transition(ReservationStatus::Confirmed, now),
            // Pending -> Confirmed is an edge, but it is not an unassignment.
            from => Err(BookingError::InvalidTransition {
                from,
                to: ReservationStatus::Confirmed,
            }),
        }
    }

    /// Cancel from any non-terminal status, recording an optional reason.
    pub fn cancel(&self, reason: Option<String>, now: DateTime<Utc>) -> Result<Reservation> {
        let mut cancelled = self.apply_transition(ReservationStatus::Cancelled, now)?;
        cancelled.cancellation_reason = reason;
        Ok(cancelled)
    }

    /// Finish a ride that is in progress.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<Reservation> {
        self.apply_transition(ReservationStatus::Completed, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewReservation;
    use chrono::{Duration, TimeZone};
    use ReservationStatus::*;

    const EDGES: [(ReservationStatus, ReservationStatus); 9] = [
        (Pending, Confirmed),
        (Pending, Cancelled),
        (Confirmed, Assigned),
        (Confirmed, Cancelled),
        (Assigned, InProgress),
        (Assigned, Confirmed),
        (Assigned, Cancelled),
        (InProgress, Completed),
        (InProgress, Cancelled),
    ];

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn reservation(status: ReservationStatus) -> Reservation {
        let mut r = Reservation::new(
            NewReservation {
                scheduled_at: t0() + Duration::hours(2),
            },
            t0(),
        );
        r.status = status;
        if status.requires_driver() || status == Completed {
            r.driver_id = Some(DriverId::from("drv-1"));
            r.vehicle_id = Some(VehicleId::from("veh-1"));
        }
        r
    }

    #[test]
    fn table_is_total_over_all_pairs() {
        for from in ReservationStatus::ALL {
            for to in ReservationStatus::ALL {
                let listed = EDGES.contains(&(from, to));
                assert_eq!(can_transition(from, to), listed, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn self_transitions_are_illegal() {
        for s in ReservationStatus::ALL {
            assert!(!s.can_transition(s), "{s} -> {s}");
        }
    }

    #[test]
    fn listed_edges_apply_with_newer_timestamp() {
        for (from, to) in EDGES {
            let mut r = reservation(from);
            r.driver_id.get_or_insert_with(|| DriverId::from("drv-1"));
            let next = r.apply_transition(to, t0()).unwrap();
            assert_eq!(next.status, to);
            assert!(next.updated_at > r.updated_at, "{from} -> {to}");
        }
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for terminal in [Completed, Cancelled] {
            assert!(terminal.is_terminal());
            let r = reservation(terminal);
            for to in ReservationStatus::ALL {
                let err = r.apply_transition(to, t0()).unwrap_err();
                assert!(matches!(
                    err,
                    BookingError::InvalidTransition { from, to: t } if from == terminal && t == to
                ));
            }
        }
    }

    #[test]
    fn invalid_transition_names_the_edge() {
        let err = reservation(Pending).apply_transition(Completed, t0()).unwrap_err();
        assert_eq!(err.to_string(), "invalid transition: PENDING -> COMPLETED");
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn assign_from_pending_and_confirmed() {
        for from in [Pending, Confirmed] {
            let r = reservation(from);
            let assigned = r
                .assign_driver(DriverId::from("drv-9"), Some(VehicleId::from("veh-9")), t0())
                .unwrap();
            assert_eq!(assigned.status, Assigned);
            assert_eq!(assigned.driver_id, Some(DriverId::from("drv-9")));
            assert_eq!(assigned.vehicle_id, Some(VehicleId::from("veh-9")));
            assert!(assigned.updated_at > r.updated_at);
        }
    }

    #[test]
    fn assign_without_vehicle() {
        let assigned = reservation(Confirmed)
            .assign_driver(DriverId::from("drv-2"), None, t0())
            .unwrap();
        assert_eq!(assigned.status, Assigned);
        assert_eq!(assigned.vehicle_id, None);
    }

    #[test]
    fn assign_rejected_elsewhere() {
        for from in [Assigned, InProgress, Completed, Cancelled] {
            let err = reservation(from)
                .assign_driver(DriverId::from("drv-9"), None, t0())
                .unwrap_err();
            assert!(matches!(err, BookingError::NotAssignable { status } if status == from));
        }
    }

    #[test]
    fn unassign_in_progress_is_refused() {
        let r = reservation(InProgress);
        let before = r.clone();
        let err = r.unassign_driver(t0()).unwrap_err();
        assert!(matches!(err, BookingError::CannotUnassignInProgress));
        assert_eq!(r, before);
    }

    #[test]
    fn unassign_from_assigned_clears_driver() {
        let r = reservation(Assigned);
        let released = r.unassign_driver(t0()).unwrap();
        assert_eq!(released.status, Confirmed);
        assert_eq!(released.driver_id, None);
        assert_eq!(released.vehicle_id, None);
    }

    #[test]
    fn unassign_from_other_statuses_is_invalid() {
        for from in [Pending, Confirmed, Completed, Cancelled] {
            let err = reservation(from).unassign_driver(t0()).unwrap_err();
            assert!(matches!(err, BookingError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn progress_requires_driver() {
        let mut r = reservation(Assigned);
        r.driver_id = None;
        let err = r.apply_transition(InProgress, t0()).unwrap_err();
        assert!(matches!(err, BookingError::DriverRequired { to: InProgress }));
    }

    #[test]
    fn cancel_records_reason() {
        let cancelled = reservation(Assigned)
            .cancel(Some("customer no-show".to_string()), t0())
            .unwrap();
        assert_eq!(cancelled.status, Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("customer no-show"));
        // The driver stays on record for the cancelled ride.
        assert!(cancelled.driver_id.is_some());
    }

    #[test]
    fn complete_only_from_in_progress() {
        assert_eq!(reservation(InProgress).complete(t0()).unwrap().status, Completed);
        assert!(reservation(Assigned).complete(t0()).is_err());
    }

    #[test]
    fn clock_going_backwards_still_bumps_updated_at() {
        let r = reservation(Pending);
        let next = r.apply_transition(Confirmed, t0() - Duration::hours(1)).unwrap();
        assert!(next.updated_at > r.updated_at);
    }
}
