use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Candidates examined across both passes.
    pub processed: u32,
    /// Candidates successfully transitioned and persisted.
    pub updated: u32,
    /// One human-readable line per failure; each names the reservation id,
    /// or the pass when a whole pass failed.
    pub errors: Vec<String>,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.processed += other.processed;
        self.updated += other.updated;
        self.errors.extend(other.errors);
    }
}

/// Reservation counts per status plus the upcoming window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStats {
    pub pending: u64,
    pub confirmed: u64,
    pub assigned: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Not-yet-started reservations with pickup in `[now, now + lookahead]`.
    pub upcoming: u64,
    pub generated_at: DateTime<Utc>,
}

/// Operator view of the scheduler, as served on the admin stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub pending_count: u64,
    pub assigned_count: u64,
    pub in_progress_count: u64,
    pub upcoming_24h_count: u64,
    pub active: bool,
    pub interval_minutes: u64,
    /// Ticks run by this process since startup.
    pub ticks_run: u64,
    pub last_tick: Option<TickReport>,
}
