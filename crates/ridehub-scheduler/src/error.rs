use ridehub_bookings::BookingError;
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
///
/// None of these escape a tick; they are flattened into
/// [`TickReport::errors`](crate::types::TickReport::errors).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A per-reservation state machine or store failure.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// A whole pass could not run (e.g. its candidate query failed).
    #[error("{pass} pass failed: {reason}")]
    Tick { pass: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
