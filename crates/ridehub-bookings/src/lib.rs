//! `ridehub-bookings` — reservation model, status state machine and persistence.
//!
//! # Overview
//!
//! A [`Reservation`] only ever changes status through the transition table in
//! [`lifecycle`]. Callers run the state machine on an in-memory copy, then
//! persist the difference with one guarded write through a
//! [`ReservationStore`]. [`BookingService`] wires the two together for
//! request handlers; the scheduler crate does the same for time-driven moves.
//!
//! | Current      | Allowed next                       |
//! |--------------|------------------------------------|
//! | `Pending`    | `Confirmed`, `Cancelled`           |
//! | `Confirmed`  | `Assigned`, `Cancelled`            |
//! | `Assigned`   | `InProgress`, `Confirmed`, `Cancelled` |
//! | `InProgress` | `Completed`, `Cancelled`           |
//! | `Completed`  | terminal                           |
//! | `Cancelled`  | terminal                           |

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{BookingError, Result};
pub use service::BookingService;
pub use sqlite::SqliteReservationStore;
pub use store::{ReservationFilter, ReservationPatch, ReservationStore};
pub use types::{NewReservation, Reservation, ReservationStatus};
