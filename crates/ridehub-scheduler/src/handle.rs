use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use ridehub_core::config::MAX_TICK_INTERVAL_MINUTES;

use crate::engine::SchedulerEngine;

const FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

/// Owner-held handle for a running scheduler loop.
///
/// Returned by [`start`]; the bootstrap keeps it for the process lifetime.
/// Dropping it closes the shutdown channel, which also ends the loop.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
}

impl SchedulerHandle {
    /// Stop scheduling further ticks.
    ///
    /// A tick already in flight runs to completion before this returns.
    /// Calling `stop` again is a no-op.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("scheduler task ended abnormally: {e}");
            }
            info!("booking scheduler stopped");
        }
    }

    /// True while the loop is running.
    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Tick interval rounded down to whole minutes.
    pub fn interval_minutes(&self) -> u64 {
        self.interval.as_secs() / 60
    }
}

/// Spawn the scheduler loop: one tick immediately, then one every `interval`.
///
/// Must be called from within a tokio runtime. A zero interval falls back
/// to one minute.
pub fn start(engine: Arc<SchedulerEngine>, interval: Duration) -> SchedulerHandle {
    let interval = if interval.is_zero() {
        warn!("scheduler interval of zero requested, using 60s");
        FALLBACK_INTERVAL
    } else {
        interval
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(engine, interval, shutdown_rx));

    SchedulerHandle {
        shutdown_tx,
        task: Mutex::new(Some(task)),
        interval,
    }
}

/// [`start`] with the interval given in minutes, as configured. Clamped to
/// `1..=MAX_TICK_INTERVAL_MINUTES`.
pub fn start_minutes(engine: Arc<SchedulerEngine>, minutes: u64) -> SchedulerHandle {
    let minutes = minutes.clamp(1, MAX_TICK_INTERVAL_MINUTES);
    start(engine, Duration::from_secs(minutes.saturating_mul(60)))
}

async fn run(engine: Arc<SchedulerEngine>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(interval_secs = period.as_secs(), "booking scheduler started");

    // The first tick of a tokio interval completes immediately.
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("booking scheduler shutting down");
                    break;
                }
            }
            _ = interval.tick() => {
                engine.process_scheduled_bookings().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SchedulePolicy;
    use ridehub_bookings::SqliteReservationStore;
    use std::time::Instant;

    fn engine() -> Arc<SchedulerEngine> {
        let store = SqliteReservationStore::open_in_memory().unwrap();
        Arc::new(SchedulerEngine::new(Arc::new(store), SchedulePolicy::default()))
    }

    async fn wait_for(mut cond: impl FnMut() -> bool, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cond()
    }

    #[tokio::test]
    async fn first_tick_runs_immediately() {
        let engine = engine();
        let handle = start(Arc::clone(&engine), Duration::from_secs(3600));

        assert!(wait_for(|| engine.ticks_run() >= 1, Duration::from_secs(2)).await);
        assert_eq!(engine.ticks_run(), 1);
        assert!(handle.is_active());
        assert_eq!(handle.interval_minutes(), 60);

        handle.stop().await;
    }

    #[tokio::test]
    async fn ticks_repeat_until_stopped() {
        let engine = engine();
        let handle = start(Arc::clone(&engine), Duration::from_millis(40));

        assert!(wait_for(|| engine.ticks_run() >= 3, Duration::from_secs(3)).await);

        handle.stop().await;
        assert!(!handle.is_active());
        let after_stop = engine.ticks_run();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.ticks_run(), after_stop);

        // Second stop is a no-op.
        handle.stop().await;
        assert_eq!(engine.ticks_run(), after_stop);
    }

    #[tokio::test]
    async fn dropping_the_handle_ends_the_loop() {
        let engine = engine();
        let handle = start(Arc::clone(&engine), Duration::from_millis(20));
        assert!(wait_for(|| engine.ticks_run() >= 1, Duration::from_secs(2)).await);
        drop(handle);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let settled = engine.ticks_run();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(engine.ticks_run(), settled);
    }

    #[tokio::test]
    async fn zero_minutes_clamps_to_one() {
        let handle = start_minutes(engine(), 0);
        assert_eq!(handle.interval_minutes(), 1);
        handle.stop().await;
    }

    #[tokio::test]
    async fn huge_minutes_clamp_to_the_config_maximum() {
        let engine = engine();
        let handle = start_minutes(Arc::clone(&engine), u64::MAX);
        assert_eq!(handle.interval_minutes(), MAX_TICK_INTERVAL_MINUTES);

        assert!(wait_for(|| engine.ticks_run() >= 1, Duration::from_secs(2)).await);
        handle.stop().await;
    }
}
