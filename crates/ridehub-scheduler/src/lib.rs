//! `ridehub-scheduler` — time-driven advancement of ride reservations.
//!
//! # Overview
//!
//! [`SchedulerEngine`] runs a tick: it reads candidate reservations from a
//! [`ReservationStore`](ridehub_bookings::ReservationStore), checks their
//! pickup time, and moves them along through the booking state machine.
//! [`start`] spawns a tokio task that ticks once immediately and then on a
//! fixed interval; the returned [`SchedulerHandle`] stops it.
//!
//! # Passes (in order)
//!
//! | Pass         | Candidates                                      | Moves to      |
//! |--------------|-------------------------------------------------|---------------|
//! | auto-start   | `ASSIGNED`, driver set, `scheduled_at <= now`   | `IN_PROGRESS` |
//! | auto-confirm | `PENDING`, `scheduled_at <= now + 1h`           | `CONFIRMED`   |

pub mod engine;
pub mod error;
pub mod handle;
pub mod policy;
pub mod types;

pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use handle::{start, start_minutes, SchedulerHandle};
pub use policy::SchedulePolicy;
pub use types::{ReservationStats, SchedulerStats, TickReport};
