//! Metrics Collection
//!
//! Collects and exports server metrics:
//! - Unique and duplicate numbers
//! - Admitted, rejected and active connections
//! - Protocol violations
//! - Prometheus export (optional)

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;
use uniqnum_core::config::MetricsConfig;

use crate::stats::StatsReport;

/// Deduplication store metrics collector
#[derive(Debug)]
pub struct StoreMetrics {
    unique_numbers: AtomicU64,
    duplicate_numbers: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        describe_counter!(
            "uniqnum_numbers_unique_total",
            "Total numbers seen for the first time"
        );
        describe_counter!(
            "uniqnum_numbers_duplicate_total",
            "Total numbers that had been seen before"
        );
        describe_gauge!("uniqnum_unique_total", "Running total of unique numbers");

        Self {
            unique_numbers: AtomicU64::new(0),
            duplicate_numbers: AtomicU64::new(0),
        }
    }

    pub fn record_unique(&self) {
        self.unique_numbers.fetch_add(1, Ordering::Relaxed);
        counter!("uniqnum_numbers_unique_total").increment(1);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_numbers.fetch_add(1, Ordering::Relaxed);
        counter!("uniqnum_numbers_duplicate_total").increment(1);
    }

    /// Publish the figures of a stats tick
    pub fn record_report(&self, report: &StatsReport) {
        gauge!("uniqnum_unique_total").set(report.unique_total as f64);
    }

    pub fn get_unique(&self) -> u64 {
        self.unique_numbers.load(Ordering::Relaxed)
    }

    pub fn get_duplicates(&self) -> u64 {
        self.duplicate_numbers.load(Ordering::Relaxed)
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener metrics collector
#[derive(Debug)]
pub struct ListenerMetrics {
    admitted: AtomicU64,
    rejected: AtomicU64,
    protocol_violations: AtomicU64,
    force_closed: AtomicU64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        describe_counter!(
            "uniqnum_connections_admitted_total",
            "Total connections admitted"
        );
        describe_counter!(
            "uniqnum_connections_rejected_total",
            "Total connections closed because all slots were taken"
        );
        describe_counter!(
            "uniqnum_protocol_violations_total",
            "Total connections closed for sending a malformed line"
        );
        describe_counter!(
            "uniqnum_connections_force_closed_total",
            "Total connections closed after the shutdown grace period"
        );
        describe_gauge!("uniqnum_active_connections", "Currently served connections");

        Self {
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            protocol_violations: AtomicU64::new(0),
            force_closed: AtomicU64::new(0),
        }
    }

    pub fn record_admitted(&self, active: usize) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        counter!("uniqnum_connections_admitted_total").increment(1);
        gauge!("uniqnum_active_connections").set(active as f64);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        counter!("uniqnum_connections_rejected_total").increment(1);
    }

    pub fn record_closed(&self, active: usize) {
        gauge!("uniqnum_active_connections").set(active as f64);
    }

    pub fn record_protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
        counter!("uniqnum_protocol_violations_total").increment(1);
    }

    pub fn record_force_closed(&self, count: usize) {
        self.force_closed.fetch_add(count as u64, Ordering::Relaxed);
        counter!("uniqnum_connections_force_closed_total").increment(count as u64);
    }

    pub fn get_admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    pub fn get_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn get_protocol_violations(&self) -> u64 {
        self.protocol_violations.load(Ordering::Relaxed)
    }

    pub fn get_force_closed(&self) -> u64 {
        self.force_closed.load(Ordering::Relaxed)
    }
}

impl Default for ListenerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prometheus scrape endpoint
pub struct MetricsExporter {
    config: MetricsConfig,
}

impl MetricsExporter {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Install the Prometheus recorder and its HTTP listener.
    ///
    /// Must be called from within a tokio runtime. Does nothing when
    /// metrics are disabled.
    pub fn init(&self) -> anyhow::Result<()> {
        if !self.config.enabled {
            info!("Metrics export disabled");
            return Ok(());
        }

        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid metrics bind address: {}", self.config.bind_address))?;

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;

        info!(bind_address = %addr, "Prometheus metrics exporter started");
        Ok(())
    }
}

/// Metrics shared by every server component
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    store: Arc<StoreMetrics>,
    listener: Arc<ListenerMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            store: Arc::new(StoreMetrics::new()),
            listener: Arc::new(ListenerMetrics::new()),
        }
    }

    pub fn store(&self) -> Arc<StoreMetrics> {
        Arc::clone(&self.store)
    }

    pub fn listener(&self) -> Arc<ListenerMetrics> {
        Arc::clone(&self.listener)
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            numbers_unique: self.store.get_unique(),
            numbers_duplicate: self.store.get_duplicates(),
            connections_admitted: self.listener.get_admitted(),
            connections_rejected: self.listener.get_rejected(),
            protocol_violations: self.listener.get_protocol_violations(),
            connections_force_closed: self.listener.get_force_closed(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub numbers_unique: u64,
    pub numbers_duplicate: u64,
    pub connections_admitted: u64,
    pub connections_rejected: u64,
    pub protocol_violations: u64,
    pub connections_force_closed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_metrics() {
        let metrics = StoreMetrics::new();

        metrics.record_unique();
        metrics.record_duplicate();
        metrics.record_duplicate();

        assert_eq!(metrics.get_unique(), 1);
        assert_eq!(metrics.get_duplicates(), 2);
    }

    #[test]
    fn test_listener_metrics() {
        let metrics = ListenerMetrics::new();

        metrics.record_admitted(1);
        metrics.record_rejected();
        metrics.record_protocol_violation();
        metrics.record_force_closed(3);

        assert_eq!(metrics.get_admitted(), 1);
        assert_eq!(metrics.get_rejected(), 1);
        assert_eq!(metrics.get_protocol_violations(), 1);
        assert_eq!(metrics.get_force_closed(), 3);
    }

    #[test]
    fn test_registry_snapshot() {
        let registry = MetricsRegistry::new();
        registry.store().record_unique();
        registry.listener().record_rejected();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.numbers_unique, 1);
        assert_eq!(snapshot.connections_rejected, 1);
        assert_eq!(snapshot.numbers_duplicate, 0);
    }

    #[test]
    fn test_exporter_disabled_is_noop() {
        let exporter = MetricsExporter::new(MetricsConfig::default());
        assert!(exporter.init().is_ok());
    }

    #[test]
    fn test_exporter_rejects_bad_address() {
        let exporter = MetricsExporter::new(MetricsConfig {
            enabled: true,
            bind_address: "not-an-address".to_string(),
        });
        assert!(exporter.init().is_err());
    }
}
