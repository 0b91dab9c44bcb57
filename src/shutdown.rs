//! Shutdown Coordinator
//!
//! Owns the server liveness state and the token that cancels the accept
//! loop. The state only moves forward:
//!
//! ```text
//! Running ──request_shutdown()──► Draining ──finish()──► Stopped
//! ```
//!
//! The first caller of [`request_shutdown`](ShutdownCoordinator::request_shutdown)
//! wins; every later call is a no-op.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uniqnum_core::ServerState;

#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: AtomicU8,
    accept_token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ServerState::Running as u8),
            accept_token: CancellationToken::new(),
        }
    }

    /// Current liveness state
    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move `Running -> Draining` and cancel the accept loop.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn request_shutdown(&self, reason: &str) -> bool {
        match self.state.compare_exchange(
            ServerState::Running as u8,
            ServerState::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                info!(reason, "Shutdown requested, no longer accepting clients");
                self.accept_token.cancel();
                true
            }
            Err(current) => {
                debug!(
                    reason,
                    state = %ServerState::from_u8(current),
                    "Shutdown already in progress, ignoring"
                );
                false
            }
        }
    }

    /// Move `Draining -> Stopped` once cleanup is complete.
    ///
    /// Returns false if the server was already stopped.
    pub fn finish(&self) -> bool {
        // Cleanup can only follow a drain.
        self.request_shutdown("cleanup");

        let stopped = self
            .state
            .compare_exchange(
                ServerState::Draining as u8,
                ServerState::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if stopped {
            info!("Server stopped");
        }
        stopped
    }

    /// Token cancelled when shutdown begins
    pub fn token(&self) -> CancellationToken {
        self.accept_token.clone()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
