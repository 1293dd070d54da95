use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use ridehub_bookings::{
    BookingError, Reservation, ReservationFilter, ReservationPatch, ReservationStatus,
    ReservationStore,
};
use ridehub_core::types::now_utc;
use tracing::{debug, error, info, warn};

use crate::{
    error::{Result, SchedulerError},
    handle::SchedulerHandle,
    policy::SchedulePolicy,
    types::{ReservationStats, SchedulerStats, TickReport},
};

/// Core scheduler: re-reads reservations from the store every tick and
/// advances the ones whose pickup time condition is met.
///
/// Holds no reservation state between ticks. The only in-memory state is
/// bookkeeping for operators (tick count, last report).
pub struct SchedulerEngine {
    store: Arc<dyn ReservationStore>,
    policy: SchedulePolicy,
    /// Serialises periodic and on-demand ticks so they never overlap.
    tick_lock: tokio::sync::Mutex<()>,
    ticks_run: AtomicU64,
    last_tick: Mutex<Option<TickReport>>,
}

impl SchedulerEngine {
    pub fn new(store: Arc<dyn ReservationStore>, policy: SchedulePolicy) -> Self {
        Self {
            store,
            policy,
            tick_lock: tokio::sync::Mutex::new(()),
            ticks_run: AtomicU64::new(0),
            last_tick: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::Relaxed)
    }

    pub fn last_tick(&self) -> Option<TickReport> {
        self.last_tick.lock().ok().and_then(|t| t.clone())
    }

    /// Run one tick against the current wall clock.
    pub async fn process_scheduled_bookings(&self) -> TickReport {
        self.process_scheduled_bookings_at(now_utc()).await
    }

    /// Run one tick with `now` as the time base for both passes.
    ///
    /// Never fails: per-reservation and per-pass errors are collected into
    /// the returned report. Auto-start always runs before auto-confirm.
    pub async fn process_scheduled_bookings_at(&self, now: DateTime<Utc>) -> TickReport {
        let _guard = self.tick_lock.lock().await;
        let mut report = TickReport::default();

        for pass in [Pass::AutoStart, Pass::AutoConfirm] {
            match self.run_pass(pass, now).await {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    error!(pass = pass.name(), "scheduler pass failed: {e}");
                    report.errors.push(e.to_string());
                }
            }
        }

        info!(
            processed = report.processed,
            updated = report.updated,
            errors = report.errors.len(),
            "scheduler tick complete"
        );

        self.ticks_run.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_tick.lock() {
            *last = Some(report.clone());
        }
        report
    }

    /// Reservation counts per status plus the upcoming-pickup window.
    pub async fn stats(&self) -> std::result::Result<ReservationStats, BookingError> {
        let now = now_utc();
        let upcoming = ReservationFilter::statuses(&[
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Assigned,
        ])
        .scheduled_between(now, self.policy.lookahead_horizon(now));

        Ok(ReservationStats {
            pending: self.count_status(ReservationStatus::Pending).await?,
            confirmed: self.count_status(ReservationStatus::Confirmed).await?,
            assigned: self.count_status(ReservationStatus::Assigned).await?,
            in_progress: self.count_status(ReservationStatus::InProgress).await?,
            completed: self.count_status(ReservationStatus::Completed).await?,
            cancelled: self.count_status(ReservationStatus::Cancelled).await?,
            upcoming: self.store.count_reservations(&upcoming).await?,
            generated_at: now,
        })
    }

    /// Stats as shown to operators, including the timer state from `handle`.
    pub async fn scheduler_stats(
        &self,
        handle: Option<&SchedulerHandle>,
    ) -> std::result::Result<SchedulerStats, BookingError> {
        let stats = self.stats().await?;
        Ok(SchedulerStats {
            pending_count: stats.pending,
            assigned_count: stats.assigned,
            in_progress_count: stats.in_progress,
            upcoming_24h_count: stats.upcoming,
            active: handle.is_some_and(SchedulerHandle::is_active),
            interval_minutes: handle.map_or(0, SchedulerHandle::interval_minutes),
            ticks_run: self.ticks_run(),
            last_tick: self.last_tick(),
        })
    }

    // --- private helpers ---------------------------------------------------

    async fn count_status(&self, status: ReservationStatus) -> std::result::Result<u64, BookingError> {
        self.store
            .count_reservations(&ReservationFilter::status(status))
            .await
    }

    async fn run_pass(&self, pass: Pass, now: DateTime<Utc>) -> Result<TickReport> {
        let filter = pass.candidates(&self.policy, now);
        let candidates =
            self.store
                .find_reservations(&filter)
                .await
                .map_err(|e| SchedulerError::Tick {
                    pass: pass.name(),
                    reason: e.to_string(),
                })?;

        let mut report = TickReport::default();
        for reservation in &candidates {
            report.processed += 1;
            if pass == Pass::AutoStart && !self.policy.should_start(reservation.scheduled_at, now) {
                debug!(reservation_id = %reservation.id, "outside start tolerance, skipped");
                continue;
            }

            match self.advance(reservation, pass.target(), now).await {
                Ok(true) => report.updated += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(reservation_id = %reservation.id, pass = pass.name(), "transition failed: {e}");
                    report
                        .errors
                        .push(format!("reservation {}: {e}", reservation.id));
                }
            }
        }
        Ok(report)
    }

    /// Apply one transition through the state machine and persist it.
    ///
    /// `Ok(false)` means another writer already moved the row to `target`.
    async fn advance(
        &self,
        reservation: &Reservation,
        target: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let next = reservation.apply_transition(target, now)?;
        let patch = ReservationPatch::between(reservation, &next);
        match self.store.update_reservation(&reservation.id, &patch).await {
            Ok(_) => {
                info!(
                    reservation_id = %reservation.id,
                    from = %reservation.status,
                    to = %target,
                    "reservation advanced by scheduler"
                );
                Ok(true)
            }
            Err(BookingError::StatusConflict { actual, .. }) if actual == target => {
                debug!(reservation_id = %reservation.id, "already {target}, skipped");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    AutoStart,
    AutoConfirm,
}

impl Pass {
    fn name(&self) -> &'static str {
        match self {
            Pass::AutoStart => "auto-start",
            Pass::AutoConfirm => "auto-confirm",
        }
    }

    fn target(&self) -> ReservationStatus {
        match self {
            Pass::AutoStart => ReservationStatus::InProgress,
            Pass::AutoConfirm => ReservationStatus::Confirmed,
        }
    }

    fn candidates(&self, policy: &SchedulePolicy, now: DateTime<Utc>) -> ReservationFilter {
        match self {
            Pass::AutoStart => ReservationFilter::status(ReservationStatus::Assigned)
                .with_driver()
                .scheduled_until(now),
            Pass::AutoConfirm => ReservationFilter::status(ReservationStatus::Pending)
                .scheduled_until(policy.confirm_horizon(now)),
        }
    }
}
