//! Server Listener
//!
//! Binds the listening socket, admits at most `max_clients` concurrent
//! clients and runs the shutdown sequence once any client sends
//! `terminate`.
//!
//! # Architecture
//!
//! ```text
//!                   Clients
//!                      │
//!            ┌─────────▼──────────┐
//!            │    TcpListener     │  accept loop
//!            └─────────┬──────────┘
//!                      │ try_acquire
//!         full ◄───────┼───────► admitted
//!       (close)        │
//!          ┌───────────┼───────────┐
//!          │           │           │
//!     ┌────▼────┐ ┌────▼────┐ ┌────▼────┐
//!     │ Handler │ │ Handler │ │ Handler │  ← line framing ('\n')
//!     └────┬────┘ └────┬────┘ └────┬────┘
//!          └───────────┼───────────┘
//!                      ▼
//!                 DedupStore ◄──── StatsReporter
//! ```
//!
//! # Shutdown
//!
//! 1. The accept loop stops and the listening socket is closed.
//! 2. The stats schedule is stopped.
//! 3. In-flight handlers get `shutdown_grace` to finish on their own.
//! 4. Whatever is left is force-closed.
//! 5. One final stats report is emitted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uniqnum_core::config::ServerSettings;
use uniqnum_core::{Result, UniqnumError};
use uniqnum_pool::{
    AdmissionController, ConnectionRegistry, DedupStore, MetricsRegistry, StatsReport, StatsReporter,
};

use crate::handler::ConnectionHandler;
use crate::shutdown::ShutdownCoordinator;

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How long force-closed handlers get to unwind
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000")
    pub bind_addr: String,
    /// Maximum concurrently served clients
    pub max_clients: usize,
    /// Period of the stats report
    pub stats_interval: Duration,
    /// Time in-flight clients get after shutdown begins
    pub shutdown_grace: Duration,
    /// Longest accepted line, excluding the line break
    pub max_line_length: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ListenerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            bind_addr: settings.bind_addr(),
            max_clients: settings.max_clients,
            stats_interval: settings.stats_interval(),
            shutdown_grace: settings.shutdown_grace(),
            max_line_length: settings.max_line_length,
        }
    }
}

/// How the server came down
#[derive(Debug, Clone)]
pub struct ShutdownSummary {
    /// Every handler finished within the grace period
    pub drained_cleanly: bool,
    /// Connections closed by force after the grace period
    pub force_closed: usize,
    /// Report emitted after the last handler exited
    pub final_report: StatsReport,
}

/// Number server bound to its listening socket
pub struct Server {
    config: ListenerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    store: Arc<DedupStore>,
    admission: AdmissionController,
    registry: Arc<ConnectionRegistry>,
    reporter: StatsReporter,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: MetricsRegistry,
    tracker: TaskTracker,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`UniqnumError::Bind`] if the address is unavailable.
    pub async fn bind(config: ListenerConfig) -> Result<Self> {
        Self::bind_with_metrics(config, MetricsRegistry::new()).await
    }

    /// Bind the listening socket, reporting into `metrics`
    pub async fn bind_with_metrics(config: ListenerConfig, metrics: MetricsRegistry) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| UniqnumError::bind(config.bind_addr.clone(), e))?;
        let local_addr = listener.local_addr()?;

        let store = Arc::new(DedupStore::with_metrics(metrics.store()));
        let reporter = StatsReporter::new(Arc::clone(&store), config.stats_interval);

        info!(
            bind_addr = %local_addr,
            max_clients = config.max_clients,
            "Server listening"
        );

        Ok(Self {
            admission: AdmissionController::new(config.max_clients),
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            tracker: TaskTracker::new(),
            config,
            listener,
            local_addr,
            store,
            reporter,
            metrics,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared deduplication store
    pub fn store(&self) -> Arc<DedupStore> {
        Arc::clone(&self.store)
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Handle that can begin shutdown from outside, e.g. on Ctrl-C
    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    pub fn metrics(&self) -> MetricsRegistry {
        self.metrics.clone()
    }

    /// Serve clients until shutdown is requested, then drain.
    pub async fn run(self) -> Result<ShutdownSummary> {
        let Server {
            config,
            listener,
            local_addr,
            store,
            admission,
            registry,
            reporter,
            shutdown,
            metrics,
            tracker,
        } = self;

        let handler = ConnectionHandler::new(
            Arc::clone(&store),
            Arc::clone(&shutdown),
            metrics.listener(),
            config.max_line_length,
        );
        let accept_token = shutdown.token();

        reporter.start();
        info!(bind_addr = %local_addr, "Accept loop started");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = accept_token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let Some(permit) = admission.try_acquire() else {
                        reject(stream, peer, &admission, &metrics);
                        continue;
                    };

                    let guard = registry.register(peer, permit);
                    let listener_metrics = metrics.listener();
                    listener_metrics.record_admitted(admission.in_use());

                    info!(
                        connection_id = %guard.id(),
                        peer = %peer,
                        active = admission.in_use(),
                        "Client connected"
                    );

                    let handler = handler.clone();
                    let admission = admission.clone();
                    tracker.spawn(async move {
                        let id = guard.id();
                        let exit = handler.run(stream, guard).await;
                        exit.log(id, peer);
                        listener_metrics.record_closed(admission.in_use());
                    });
                }
                Err(e) => {
                    if !shutdown.state().is_running() {
                        debug!(error = %e, "Accept failed after shutdown began");
                        break;
                    }
                    error!(error = %e, "Accept error");
                    tokio::select! {
                        _ = accept_token.cancelled() => break,
                        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        drop(listener);
        info!(bind_addr = %local_addr, "Listening socket closed");

        reporter.stop().await;

        tracker.close();
        let in_flight = tracker.len();
        if in_flight > 0 {
            info!(
                in_flight,
                grace_ms = config.shutdown_grace.as_millis() as u64,
                "Waiting for connected clients to finish"
            );
        }

        let drained_cleanly = tokio::time::timeout(config.shutdown_grace, tracker.wait())
            .await
            .is_ok();

        let mut force_closed = 0;
        if !drained_cleanly {
            force_closed = registry.force_close_all();
            metrics.listener().record_force_closed(force_closed);
            warn!(force_closed, "Grace period expired, closing remaining clients");

            if tokio::time::timeout(FORCE_CLOSE_WAIT, tracker.wait())
                .await
                .is_err()
            {
                warn!(remaining = tracker.len(), "Some handlers did not exit after force close");
            }
        }

        let final_report = reporter.tick();
        shutdown.finish();

        Ok(ShutdownSummary {
            drained_cleanly,
            force_closed,
            final_report,
        })
    }
}

/// Close an over-capacity connection without reading from it
fn reject(stream: TcpStream, peer: SocketAddr, admission: &AdmissionController, metrics: &MetricsRegistry) {
    warn!(
        peer = %peer,
        max_clients = admission.capacity(),
        "Connection limit reached, rejecting client"
    );
    metrics.listener().record_rejected();
    drop(stream);
    debug!(peer = %peer, "Rejected connection closed");
}
