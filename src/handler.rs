//! Client connection handler
//!
//! Reads newline-terminated lines from one admitted client and feeds them to
//! the shared [`DedupStore`]. The handler stops at end of stream, at the
//! first invalid line, on `terminate`, or when shutdown force-closes it.

use futures::StreamExt;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};
use uniqnum_core::protocol::{parse_line, Line};
use uniqnum_core::{ConnectionId, ProtocolError};
use uniqnum_pool::{ConnectionGuard, DedupStore, ListenerMetrics};

use crate::shutdown::ShutdownCoordinator;

/// Tracing target carrying one event per unique number
pub const NUMBERS_TARGET: &str = "uniqnum::numbers";

/// What to do after one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Keep reading
    Continue,
    /// Client asked the whole server to stop
    Terminate,
    /// Line was invalid; close this connection
    ProtocolError(ProtocolError),
}

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionExit {
    EndOfStream,
    Terminated,
    ProtocolViolation(ProtocolError),
    ReadError(String),
    ForceClosed,
}

impl fmt::Display for ConnectionExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionExit::EndOfStream => write!(f, "end of stream"),
            ConnectionExit::Terminated => write!(f, "terminate received"),
            ConnectionExit::ProtocolViolation(e) => write!(f, "protocol violation: {}", e),
            ConnectionExit::ReadError(e) => write!(f, "read error: {}", e),
            ConnectionExit::ForceClosed => write!(f, "force-closed during shutdown"),
        }
    }
}

impl ConnectionExit {
    /// Emit the closing log line for a connection
    pub fn log(&self, id: ConnectionId, peer: SocketAddr) {
        match self {
            ConnectionExit::EndOfStream => {
                info!(connection_id = %id, peer = %peer, "Client closed the connection")
            }
            ConnectionExit::Terminated => {
                info!(connection_id = %id, peer = %peer, "Terminate received, closing connection")
            }
            ConnectionExit::ProtocolViolation(e) => {
                warn!(connection_id = %id, peer = %peer, error = %e, "Invalid input, closing connection")
            }
            ConnectionExit::ReadError(e) => {
                error!(connection_id = %id, peer = %peer, error = %e, "Read error, closing connection")
            }
            ConnectionExit::ForceClosed => {
                warn!(connection_id = %id, peer = %peer, "Connection force-closed after grace period")
            }
        }
    }
}

/// Per-connection line processor
#[derive(Clone)]
pub struct ConnectionHandler {
    store: Arc<DedupStore>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Arc<ListenerMetrics>,
    max_line_length: usize,
}

impl ConnectionHandler {
    pub fn new(
        store: Arc<DedupStore>,
        shutdown: Arc<ShutdownCoordinator>,
        metrics: Arc<ListenerMetrics>,
        max_line_length: usize,
    ) -> Self {
        Self {
            store,
            shutdown,
            metrics,
            max_line_length,
        }
    }

    /// Classify one line (line break already stripped) and record it.
    ///
    /// A number seen for the first time is logged on [`NUMBERS_TARGET`].
    pub fn process_line(&self, line: &str) -> LineOutcome {
        match parse_line(line) {
            Ok(Line::Number(number)) => {
                if self.store.add(number) {
                    info!(target: NUMBERS_TARGET, "{}", number);
                }
                LineOutcome::Continue
            }
            Ok(Line::Terminate) => LineOutcome::Terminate,
            Err(e) => LineOutcome::ProtocolError(e),
        }
    }

    /// Serve one client until it finishes, misbehaves or is force-closed.
    ///
    /// The socket is shut down and `guard` dropped before returning, which
    /// releases the admission slot.
    pub async fn run<S>(&self, stream: S, guard: ConnectionGuard) -> ConnectionExit
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(
            stream,
            LinesCodec::new_with_max_length(self.max_line_length),
        );
        let close_token = guard.close_token().clone();

        debug!(connection_id = %guard.id(), peer = %guard.peer(), "Reading client input");

        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = close_token.cancelled() => break ConnectionExit::ForceClosed,
                next = lines.next() => next,
            };

            match next {
                None => break ConnectionExit::EndOfStream,
                Some(Ok(line)) => match self.process_line(&line) {
                    LineOutcome::Continue => {}
                    LineOutcome::Terminate => {
                        self.shutdown.request_shutdown("terminate command");
                        break ConnectionExit::Terminated;
                    }
                    LineOutcome::ProtocolError(e) => break ConnectionExit::ProtocolViolation(e),
                },
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    break ConnectionExit::ProtocolViolation(ProtocolError::LineTooLong {
                        max: self.max_line_length,
                    });
                }
                Some(Err(LinesCodecError::Io(e))) if e.kind() == io::ErrorKind::InvalidData => {
                    break ConnectionExit::ProtocolViolation(ProtocolError::InvalidEncoding);
                }
                Some(Err(LinesCodecError::Io(e))) => break ConnectionExit::ReadError(e.to_string()),
            }
        };

        if matches!(exit, ConnectionExit::ProtocolViolation(_)) {
            self.metrics.record_protocol_violation();
        }

        let mut stream = lines.into_inner();
        if let Err(e) = stream.shutdown().await {
            if exit == ConnectionExit::ForceClosed {
                warn!(
                    connection_id = %guard.id(),
                    error = %e,
                    "Failed to close client socket while shutting down"
                );
            } else {
                debug!(connection_id = %guard.id(), error = %e, "Socket shutdown failed");
            }
        }
        drop(stream);
        drop(guard);

        exit
    }
}
