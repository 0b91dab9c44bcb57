//! Admission Control
//!
//! Bounds the number of simultaneously served clients with a counting
//! semaphore. Admission never waits: a client beyond capacity is rejected,
//! not queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Slots currently held
    pub in_use: usize,
    /// Slots currently free
    pub available: usize,
    /// Total admitted clients
    pub total_admitted: u64,
    /// Total rejected clients
    pub total_rejected: u64,
}

/// Admission Controller
///
/// A bounded gate with `capacity` slots. [`try_acquire`](Self::try_acquire)
/// returns immediately; the returned [`AdmissionPermit`] gives its slot back
/// when dropped, so every exit path of the gated handler releases exactly
/// once.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    stats: Arc<AdmissionCounters>,
}

#[derive(Debug, Default)]
struct AdmissionCounters {
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl AdmissionController {
    /// Create a controller with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds `Semaphore::MAX_PERMITS`. Configured
    /// capacities are bounded well below that by `ServerSettings` validation.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            stats: Arc::new(AdmissionCounters::default()),
        }
    }

    /// Try to take a slot without waiting.
    ///
    /// Returns `None` when all slots are held.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => {
                self.stats.admitted.fetch_add(1, Ordering::Relaxed);
                Some(AdmissionPermit { _permit: permit })
            }
            Err(_) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of held slots
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Get admission statistics
    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            in_use: self.in_use(),
            available: self.available(),
            total_admitted: self.stats.admitted.load(Ordering::Relaxed),
            total_rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }
}

/// One admission slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}
