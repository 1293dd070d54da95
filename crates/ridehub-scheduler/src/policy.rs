use chrono::{DateTime, Duration, Utc};
use ridehub_core::config::{
    SchedulerConfig, MAX_CONFIRM_LEAD_MINUTES, MAX_START_TOLERANCE_MINUTES,
    MAX_STATS_LOOKAHEAD_HOURS,
};

/// Time windows that decide which reservations a tick advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Slack on the auto-start comparison against `scheduled_at`.
    pub start_tolerance: Duration,
    /// Pending bookings whose pickup is within this lead are auto-confirmed.
    pub confirm_lead: Duration,
    /// Horizon of the "upcoming" count in stats.
    pub stats_lookahead: Duration,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

/// Values are clamped to the ranges `SchedulerConfig::validate` accepts, so a
/// config built by hand cannot overflow the tick's arithmetic either.
impl From<&SchedulerConfig> for SchedulePolicy {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            start_tolerance: Duration::minutes(
                cfg.start_tolerance_minutes.clamp(0, MAX_START_TOLERANCE_MINUTES),
            ),
            confirm_lead: Duration::minutes(
                cfg.confirm_lead_minutes.clamp(0, MAX_CONFIRM_LEAD_MINUTES),
            ),
            stats_lookahead: Duration::hours(
                cfg.stats_lookahead_hours.clamp(0, MAX_STATS_LOOKAHEAD_HOURS),
            ),
        }
    }
}

impl SchedulePolicy {
    /// Whether an assigned ride scheduled at `scheduled_at` should start at `now`.
    ///
    /// The candidate query already bounds `scheduled_at <= now`, so this only
    /// matters if the store and the engine disagree about the clock.
    pub fn should_start(&self, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        scheduled_at <= saturating_add(now, self.start_tolerance)
    }

    /// Latest `scheduled_at` that the auto-confirm pass picks up at `now`.
    pub fn confirm_horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        saturating_add(now, self.confirm_lead)
    }

    pub fn lookahead_horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        saturating_add(now, self.stats_lookahead)
    }
}

fn saturating_add(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
