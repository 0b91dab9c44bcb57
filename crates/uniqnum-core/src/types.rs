//! Core types shared by the server, the pool and the connection handlers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A value received from a client.
///
/// Always in `[0, Number::MAX]`: clients send exactly nine decimal digits.
/// Numbers are values, not identities; two equal numbers from different
/// clients are the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Number(u32);

impl Number {
    /// Largest representable number (nine nines).
    pub const MAX: u32 = 999_999_999;

    /// Number of digits on the wire.
    pub const DIGITS: usize = 9;

    /// Creates a number, returning `None` if it is out of range.
    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Returns the numeric value.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Number> for u32 {
    fn from(n: Number) -> Self {
        n.0
    }
}

/// Unique identifier for an accepted client connection.
///
/// Wraps a UUID v4 so registry entries never collide even if the same peer
/// address reconnects while its previous handler is still tearing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server liveness.
///
/// Moves forward only: `Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ServerState {
    /// Accepting and serving clients
    Running = 0,
    /// Terminate received; no new clients, in-flight ones get a grace period
    Draining = 1,
    /// Cleanup finished
    Stopped = 2,
}

impl ServerState {
    /// Decodes the value stored in an atomic.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ServerState::Running,
            1 => ServerState::Draining,
            _ => ServerState::Stopped,
        }
    }

    /// Returns true if the server is still accepting clients.
    pub fn is_running(&self) -> bool {
        matches!(self, ServerState::Running)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Running => write!(f, "running"),
            ServerState::Draining => write!(f, "draining"),
            ServerState::Stopped => write!(f, "stopped"),
        }
    }
}
