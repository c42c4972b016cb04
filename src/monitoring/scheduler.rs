//! The recurring-check scheduler.
//!
//! Owns exactly one running task per active endpoint, keyed by endpoint id.
//! Scheduling the same id again replaces the old task instead of stacking a
//! second one, so API-layer retries and reconciliation stay idempotent. The
//! table is plain in-process state; on startup `reconcile` rebuilds it from
//! the set of active endpoints in the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::db::services::endpoint_service;

pub const MIN_INTERVAL_SEC: i32 = 30;
pub const MAX_INTERVAL_SEC: i32 = 3600;

/// How many probe/alert cycles may run at once across all endpoints.
const CHECK_CONCURRENCY: usize = 5;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("check interval {0}s is outside {MIN_INTERVAL_SEC}..={MAX_INTERVAL_SEC}s")]
    IntervalOutOfRange(i32),
    #[error("scheduler is shut down")]
    ShutDown,
}

/// What a single fired tick concluded. `Stale` asks the scheduler to drop
/// the entry: the endpoint was deleted, paused, or lost its owner between
/// scheduling and firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    Stale,
}

/// The per-tick pipeline, injected so the scheduler can be exercised in
/// tests without a database or network.
#[async_trait]
pub trait TickRunner: Send + Sync + 'static {
    async fn run_tick(&self, endpoint_id: i32) -> TickOutcome;
}

struct ScheduledCheck {
    handle: JoinHandle<()>,
    interval_sec: i32,
    generation: u64,
}

pub struct CheckScheduler<R: TickRunner> {
    tasks: Arc<Mutex<HashMap<i32, ScheduledCheck>>>,
    runner: Arc<R>,
    permits: Arc<Semaphore>,
    generation: AtomicU64,
    shutting_down: AtomicBool,
}

impl<R: TickRunner> CheckScheduler<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            runner,
            permits: Arc::new(Semaphore::new(CHECK_CONCURRENCY)),
            generation: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Creates or replaces the recurring check for an endpoint. The first
    /// tick fires one full interval after this call.
    pub async fn schedule(&self, endpoint_id: i32, interval_sec: i32) -> Result<(), SchedulerError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }
        if !(MIN_INTERVAL_SEC..=MAX_INTERVAL_SEC).contains(&interval_sec) {
            return Err(SchedulerError::IntervalOutOfRange(interval_sec));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let handle = self.spawn_check_loop(endpoint_id, interval_sec, generation);

        let mut tasks = self.tasks.lock().await;
        if let Some(old) = tasks.insert(
            endpoint_id,
            ScheduledCheck {
                handle,
                interval_sec,
                generation,
            },
        ) {
            info!(endpoint_id, "Replacing existing check schedule.");
            old.handle.abort();
        } else {
            info!(endpoint_id, interval_sec, "Scheduled recurring check.");
        }
        Ok(())
    }

    /// Removes the entry for an endpoint. Absence is not an error.
    pub async fn unschedule(&self, endpoint_id: i32) {
        let mut tasks = self.tasks.lock().await;
        if let Some(entry) = tasks.remove(&endpoint_id) {
            entry.handle.abort();
            info!(endpoint_id, "Unscheduled recurring check.");
        }
    }

    /// Replaces the schedule only when the endpoint is active; paused
    /// endpoints pick the new interval up on resume.
    pub async fn reschedule_if_active(
        &self,
        endpoint: &crate::db::entities::endpoint::Model,
    ) -> Result<(), SchedulerError> {
        if endpoint.is_active {
            self.schedule(endpoint.id, endpoint.check_interval_sec).await
        } else {
            Ok(())
        }
    }

    /// Rebuilds the schedule table from the durable set of active endpoints.
    /// Called once at startup; calling it again is harmless because
    /// `schedule` replaces rather than duplicates. Each endpoint keeps its
    /// own configured interval. Ownerless endpoints are still scheduled so
    /// their metrics keep flowing, but are logged as degraded — their ticks
    /// will skip alert dispatch and clean themselves up.
    pub async fn reconcile(&self, db: &DatabaseConnection) -> usize {
        let endpoints = match endpoint_service::find_active_endpoints(db).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(error = %e, "Reconcile failed to load active endpoints.");
                return 0;
            }
        };

        let mut scheduled = 0;
        for ep in &endpoints {
            if ep.user_id.is_none() {
                warn!(endpoint_id = ep.id, "Active endpoint has no owner; scheduling degraded.");
            }
            match self.schedule(ep.id, ep.check_interval_sec).await {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    error!(endpoint_id = ep.id, error = %e, "Failed to schedule endpoint during reconcile.");
                }
            }
        }
        info!(scheduled, total = endpoints.len(), "Schedule reconciliation complete.");
        scheduled
    }

    /// Number of live schedule entries, for the health endpoint.
    pub async fn entry_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn interval_for(&self, endpoint_id: i32) -> Option<i32> {
        self.tasks
            .lock()
            .await
            .get(&endpoint_id)
            .map(|entry| entry.interval_sec)
    }

    /// Aborts every recurring task and rejects further scheduling.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().await;
        for (_, entry) in tasks.drain() {
            entry.handle.abort();
        }
        info!("Check scheduler shut down.");
    }

    fn spawn_check_loop(
        &self,
        endpoint_id: i32,
        interval_sec: i32,
        generation: u64,
    ) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        let tasks = Arc::clone(&self.tasks);

        tokio::spawn(async move {
            let period = Duration::from_secs(interval_sec as u64);
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            // A tick blocked behind the concurrency limit must not burst later.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let _permit = match permits.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                if runner.run_tick(endpoint_id).await == TickOutcome::Stale {
                    let mut tasks = tasks.lock().await;
                    // Only drop our own entry; a replacement may have landed
                    // while this tick was in flight.
                    if tasks
                        .get(&endpoint_id)
                        .is_some_and(|entry| entry.generation == generation)
                    {
                        tasks.remove(&endpoint_id);
                        info!(endpoint_id, "Removed stale schedule entry.");
                    }
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingRunner {
        ticks: AtomicUsize,
        stale_after: usize,
    }

    impl CountingRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicUsize::new(0),
                stale_after: usize::MAX,
            })
        }

        fn stale_after(n: usize) -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicUsize::new(0),
                stale_after: n,
            })
        }
    }

    #[async_trait]
    impl TickRunner for CountingRunner {
        async fn run_tick(&self, _endpoint_id: i32) -> TickOutcome {
            let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stale_after {
                TickOutcome::Stale
            } else {
                TickOutcome::Completed
            }
        }
    }

    #[tokio::test]
    async fn schedule_is_replace_not_duplicate() {
        let scheduler = CheckScheduler::new(CountingRunner::new());
        scheduler.schedule(7, 60).await.unwrap();
        scheduler.schedule(7, 120).await.unwrap();

        assert_eq!(scheduler.entry_count().await, 1);
        assert_eq!(scheduler.interval_for(7).await, Some(120));
    }

    #[tokio::test]
    async fn unschedule_absent_entry_is_a_noop() {
        let scheduler = CheckScheduler::new(CountingRunner::new());
        scheduler.unschedule(42).await;
        assert_eq!(scheduler.entry_count().await, 0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_intervals() {
        let scheduler = CheckScheduler::new(CountingRunner::new());
        assert!(matches!(
            scheduler.schedule(1, 5).await,
            Err(SchedulerError::IntervalOutOfRange(5))
        ));
        assert!(matches!(
            scheduler.schedule(1, 7200).await,
            Err(SchedulerError::IntervalOutOfRange(7200))
        ));
        assert_eq!(scheduler.entry_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_rejects_later_schedules() {
        let scheduler = CheckScheduler::new(CountingRunner::new());
        scheduler.schedule(1, 60).await.unwrap();
        scheduler.shutdown().await;

        assert_eq!(scheduler.entry_count().await, 0);
        assert!(matches!(
            scheduler.schedule(2, 60).await,
            Err(SchedulerError::ShutDown)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_on_the_configured_interval() {
        let runner = CountingRunner::new();
        let scheduler = CheckScheduler::new(Arc::clone(&runner));
        scheduler.schedule(1, 60).await.unwrap();

        // Nothing before the first interval boundary.
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(runner.ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.ticks.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runner.ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_removes_its_own_entry() {
        let runner = CountingRunner::stale_after(1);
        let scheduler = CheckScheduler::new(runner);
        scheduler.schedule(9, 30).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        // Yield so the check loop finishes its cleanup.
        tokio::task::yield_now().await;
        assert_eq!(scheduler.entry_count().await, 0);
    }
}
