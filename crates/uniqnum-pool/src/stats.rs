//! Stats Reporter
//!
//! Periodic task that drains the store's interval counters and logs one
//! summary line per tick. It reads counters only, so a stalled client can
//! never hold up the schedule.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::DedupStore;

/// Figures for one reporting interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsReport {
    /// Unique numbers received this interval
    pub unique: u64,
    /// Duplicates received this interval
    pub duplicates: u64,
    /// Unique numbers received since start
    pub unique_total: u64,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {} unique numbers, {} duplicates. Unique total: {}",
            self.unique, self.duplicates, self.unique_total
        )
    }
}

/// Fixed-rate reporter over a [`DedupStore`].
///
/// The first report fires one full interval after [`start`](Self::start).
/// A stopped reporter can be started again.
pub struct StatsReporter {
    store: Arc<DedupStore>,
    interval: Duration,
    task: Mutex<Option<ScheduledTask>>,
}

struct ScheduledTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatsReporter {
    /// Create a reporter; nothing runs until `start`
    pub fn new(store: Arc<DedupStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Compute and log one report immediately
    pub fn tick(&self) -> StatsReport {
        Self::report(&self.store)
    }

    fn report(store: &DedupStore) -> StatsReport {
        let duplicates = store.drain_duplicates_since_last_run();
        let unique = store.unique_delta_since_last_run();
        let report = StatsReport {
            unique,
            duplicates,
            unique_total: store.unique_total_at_last_run(),
        };

        info!(
            unique = report.unique,
            duplicates = report.duplicates,
            unique_total = report.unique_total,
            "{}",
            report
        );
        store.metrics().record_report(&report);

        report
    }

    /// Spawn the periodic task. Has no effect while already running.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let store = Arc::clone(&self.store);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!(interval_ms = period.as_millis() as u64, "Stats reporter started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        Self::report(&store);
                    }
                }
            }

            debug!("Stats reporter stopped");
        });

        *task = Some(ScheduledTask {
            cancel: token,
            handle,
        });
    }

    /// Stop the schedule and wait for the task to exit
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
    }

    /// Whether the periodic task is running
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uniqnum_core::Number;

    fn n(value: u32) -> Number {
        Number::new(value).unwrap()
    }

    #[test]
    fn test_report_format() {
        let report = StatsReport {
            unique: 2,
            duplicates: 1,
            unique_total: 2,
        };
        assert_eq!(
            report.to_string(),
            "Received 2 unique numbers, 1 duplicates. Unique total: 2"
        );
    }

    #[test]
    fn test_tick_drains_interval_counters() {
        let store = Arc::new(DedupStore::new());
        let reporter = StatsReporter::new(Arc::clone(&store), Duration::from_secs(10));

        store.add(n(123_456_789));
        store.add(n(123_456_789));
        store.add(n(0));

        assert_eq!(
            reporter.tick(),
            StatsReport {
                unique: 2,
                duplicates: 1,
                unique_total: 2
            }
        );

        // Nothing new since the last tick
        assert_eq!(
            reporter.tick(),
            StatsReport {
                unique: 0,
                duplicates: 0,
                unique_total: 2
            }
        );

        store.add(n(5));
        store.add(n(0));
        assert_eq!(
            reporter.tick(),
            StatsReport {
                unique: 1,
                duplicates: 1,
                unique_total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_periodic_schedule_and_stop() {
        let store = Arc::new(DedupStore::new());
        let reporter = StatsReporter::new(Arc::clone(&store), Duration::from_millis(50));

        store.add(n(1));
        store.add(n(1));
        reporter.start();
        assert!(reporter.is_running());

        tokio::time::sleep(Duration::from_millis(180)).await;

        // The scheduled ticks already drained the counters
        assert_eq!(store.pending_duplicates(), 0);
        assert_eq!(store.unique_delta_since_last_run(), 0);

        reporter.stop().await;
        assert!(!reporter.is_running());

        // No more ticks after stop
        store.add(n(2));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(store.unique_delta_since_last_run(), 1);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let store = Arc::new(DedupStore::new());
        let reporter = StatsReporter::new(Arc::clone(&store), Duration::from_millis(50));

        reporter.start();
        reporter.stop().await;
        assert!(!reporter.is_running());

        store.add(n(3));
        store.add(n(3));
        reporter.start();
        assert!(reporter.is_running());

        tokio::time::sleep(Duration::from_millis(180)).await;
        assert!(reporter.is_running());
        assert_eq!(store.pending_duplicates(), 0);
        assert_eq!(store.unique_total_at_last_run(), 1);

        reporter.stop().await;
        assert!(!reporter.is_running());
    }

    #[tokio::test]
    async fn test_first_tick_waits_one_interval() {
        let store = Arc::new(DedupStore::new());
        let reporter = StatsReporter::new(Arc::clone(&store), Duration::from_millis(300));

        store.add(n(9));
        store.add(n(9));
        reporter.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.pending_duplicates(), 1);

        reporter.stop().await;
    }
}
