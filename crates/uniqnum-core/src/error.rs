//! Error types for the uniqnum server.
//!
//! Three families of failure exist and they never mix:
//!
//! - [`UniqnumError`] is process scope. Binding the listener and loading
//!   configuration are the only operations that can produce one that ends
//!   the process.
//! - [`ProtocolError`] is connection scope. It closes one client socket and
//!   is never propagated past the connection handler.
//! - [`ConfigError`] is raised while loading or validating [`AppConfig`].
//!
//! The `terminate` command is deliberately absent: it is a control outcome
//! (see [`crate::protocol::Line::Terminate`]), not an error.
//!
//! [`AppConfig`]: crate::config::AppConfig

use std::io;
use thiserror::Error;

/// Result type alias using UniqnumError as the error type.
pub type Result<T> = std::result::Result<T, UniqnumError>;

/// Top-level error type for server operations.
#[derive(Debug, Error)]
pub enum UniqnumError {
    /// The listening socket could not be created. Fatal at startup.
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors outside of a single client connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl UniqnumError {
    /// Creates a bind error for the given address.
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}

/// A client sent something that is neither a number nor `terminate`.
///
/// Always local to one connection: the handler closes that socket and
/// nothing else happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line is not exactly nine ASCII digits
    #[error("Invalid number provided: {line:?}")]
    Malformed { line: String },

    /// The client sent more than `max` bytes without a line break
    #[error("Line exceeds maximum length of {max} bytes")]
    LineTooLong { max: usize },

    /// The line was not valid UTF-8
    #[error("Line is not valid text")]
    InvalidEncoding,
}

impl ProtocolError {
    /// Creates a malformed line error.
    pub fn malformed(line: impl Into<String>) -> Self {
        Self::Malformed { line: line.into() }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
