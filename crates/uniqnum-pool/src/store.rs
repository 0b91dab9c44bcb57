//! Deduplication Store
//!
//! Server-wide set of every number seen so far, plus the counters the
//! stats reporter drains once per interval.
//!
//! Membership test and insert are one atomic operation (`DashSet::insert`
//! locks the owning shard), so N concurrent adds of the same value yield one
//! unique credit and N-1 duplicate credits no matter how they interleave.

use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uniqnum_core::Number;

use crate::metrics::StoreMetrics;

/// Concurrent number set with unique/duplicate accounting.
#[derive(Debug)]
pub struct DedupStore {
    /// Every number ever added
    numbers: DashSet<Number>,
    /// Incremented after each successful insert; equals `numbers.len()` once
    /// in-flight adds complete
    unique_total: AtomicU64,
    /// Duplicates since the last drain
    duplicates: AtomicU64,
    /// `unique_total` as of the last delta computation
    last_known_unique: AtomicU64,
    metrics: Arc<StoreMetrics>,
}

impl DedupStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(StoreMetrics::new()))
    }

    /// Create an empty store reporting into `metrics`
    pub fn with_metrics(metrics: Arc<StoreMetrics>) -> Self {
        Self {
            numbers: DashSet::new(),
            unique_total: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            last_known_unique: AtomicU64::new(0),
            metrics,
        }
    }

    /// Record a number.
    ///
    /// Returns true exactly once per distinct value, the first time any
    /// handler adds it. Every later add of the same value returns false and
    /// counts one duplicate.
    pub fn add(&self, number: Number) -> bool {
        if self.numbers.insert(number) {
            self.unique_total.fetch_add(1, Ordering::AcqRel);
            self.metrics.record_unique();
            true
        } else {
            self.duplicates.fetch_add(1, Ordering::AcqRel);
            self.metrics.record_duplicate();
            false
        }
    }

    /// Read and reset the duplicate counter in one step.
    pub fn drain_duplicates_since_last_run(&self) -> u64 {
        self.duplicates.swap(0, Ordering::AcqRel)
    }

    /// Number of unique values added since the previous call.
    ///
    /// The snapshot only ever moves forward (compare-and-swap), so an add
    /// racing with this call is credited to this interval or the next one,
    /// never both and never neither.
    pub fn unique_delta_since_last_run(&self) -> u64 {
        loop {
            let last = self.last_known_unique.load(Ordering::Acquire);
            let current = self.unique_total.load(Ordering::Acquire);

            if current <= last {
                return 0;
            }

            if self
                .last_known_unique
                .compare_exchange(last, current, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return current - last;
            }
        }
    }

    /// Running total of unique numbers
    pub fn total_unique(&self) -> u64 {
        self.unique_total.load(Ordering::Acquire)
    }

    /// Unique total as of the most recent delta computation
    pub fn unique_total_at_last_run(&self) -> u64 {
        self.last_known_unique.load(Ordering::Acquire)
    }

    /// Duplicates counted since the last drain, without resetting
    pub fn pending_duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Acquire)
    }

    /// Whether `number` has been seen
    pub fn contains(&self, number: Number) -> bool {
        self.numbers.contains(&number)
    }

    /// Store metrics handle
    pub fn metrics(&self) -> Arc<StoreMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl Default for DedupStore {
    fn default() -> Self {
        Self::new()
    }
}
