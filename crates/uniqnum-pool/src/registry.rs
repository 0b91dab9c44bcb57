//! Active Connection Registry
//!
//! Tracks live client connections so shutdown can force-close whatever is
//! still open once the grace period expires. Not used for counting; the
//! [`AdmissionController`](crate::concurrency::AdmissionController) is
//! authoritative for that.

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uniqnum_core::ConnectionId;

use crate::concurrency::AdmissionPermit;

/// Registry entry for one live connection
#[derive(Debug, Clone)]
pub struct RegisteredConnection {
    /// Unique identifier
    pub id: ConnectionId,
    /// Client address
    pub peer: SocketAddr,
    /// Cancelled to force-close the connection
    pub close_token: CancellationToken,
    /// Admission timestamp
    pub connected_at: Instant,
}

/// Concurrent set of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, RegisteredConnection>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admitted connection.
    ///
    /// The returned guard owns the admission permit. Dropping it removes the
    /// entry and releases the slot, whichever way the handler ends.
    pub fn register(self: &Arc<Self>, peer: SocketAddr, permit: AdmissionPermit) -> ConnectionGuard {
        let entry = RegisteredConnection {
            id: ConnectionId::new(),
            peer,
            close_token: CancellationToken::new(),
            connected_at: Instant::now(),
        };

        let id = entry.id;
        let close_token = entry.close_token.clone();
        self.connections.insert(id, entry);

        debug!(connection_id = %id, peer = %peer, total = self.len(), "Connection registered");

        ConnectionGuard {
            id,
            peer,
            close_token,
            registry: Arc::clone(self),
            _permit: permit,
        }
    }

    /// Remove a connection; returns false if it was already gone
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    /// Get a connection by ID
    pub fn get(&self, id: &ConnectionId) -> Option<RegisteredConnection> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of all live connections
    pub fn list(&self) -> Vec<RegisteredConnection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Signal every remaining connection to close its socket now.
    ///
    /// Returns how many connections were signalled. Entries are removed by
    /// their own guards as the handlers exit.
    pub fn force_close_all(&self) -> usize {
        let remaining = self.list();
        for conn in &remaining {
            debug!(connection_id = %conn.id, peer = %conn.peer, "Force-closing connection");
            conn.close_token.cancel();
        }
        remaining.len()
    }
}

/// Scoped registration of one admitted connection.
///
/// Holds the admission slot for as long as the handler runs.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    peer: SocketAddr,
    close_token: CancellationToken,
    registry: Arc<ConnectionRegistry>,
    _permit: AdmissionPermit,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Token cancelled when shutdown force-closes this connection
    pub fn close_token(&self) -> &CancellationToken {
        &self.close_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        debug!(connection_id = %self.id, remaining = self.registry.len(), "Connection deregistered");
    }
}
