//! uniqnum concurrency layer
//!
//! Shared state and background machinery behind the number server:
//! admission control, the deduplication store, the active connection
//! registry, the stats reporter and metrics.
//!
//! # Architecture
//!
//! ```text
//!            accept loop
//!                 │
//!        ┌────────▼─────────┐
//!        │ AdmissionControl │  try_acquire, never waits
//!        │ (concurrency.rs) │
//!        └────────┬─────────┘
//!                 │ AdmissionPermit
//!        ┌────────▼─────────┐
//!        │ConnectionRegistry│  ConnectionGuard releases on drop
//!        │  (registry.rs)   │
//!        └────────┬─────────┘
//!                 │
//!      handlers ──┼── handlers
//!                 ▼
//!        ┌──────────────────┐        ┌──────────────────┐
//!        │    DedupStore    │◄───────│  StatsReporter   │
//!        │    (store.rs)    │ drain  │    (stats.rs)    │
//!        └──────────────────┘        └──────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use uniqnum_core::Number;
//! use uniqnum_pool::{DedupStore, StatsReporter};
//!
//! let store = Arc::new(DedupStore::new());
//! assert!(store.add(Number::new(42).unwrap()));
//! assert!(!store.add(Number::new(42).unwrap()));
//!
//! let reporter = StatsReporter::new(Arc::clone(&store), Duration::from_secs(10));
//! let report = reporter.tick();
//! assert_eq!((report.unique, report.duplicates, report.unique_total), (1, 1, 1));
//! ```

pub mod concurrency;
pub mod metrics;
pub mod registry;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use crate::concurrency::{AdmissionController, AdmissionPermit, AdmissionStats};
pub use crate::metrics::{ListenerMetrics, MetricsExporter, MetricsRegistry, MetricsSnapshot, StoreMetrics};
pub use crate::registry::{ConnectionGuard, ConnectionRegistry, RegisteredConnection};
pub use crate::stats::{StatsReport, StatsReporter};
pub use crate::store::DedupStore;
