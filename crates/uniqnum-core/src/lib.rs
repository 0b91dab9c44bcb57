//! # uniqnum core
//!
//! Core types, error handling, configuration and the line protocol for the
//! uniqnum number deduplication server.
//!
//! - **Types**: [`Number`], [`ConnectionId`] and the [`ServerState`] liveness value.
//! - **Protocol**: [`protocol::parse_line`] decodes one client line.
//! - **Errors**: process-scope [`UniqnumError`] and connection-scope [`ProtocolError`].
//! - **Configuration**: [`AppConfig`] from defaults, YAML and environment.
//!
//! ## Example
//!
//! ```
//! use uniqnum_core::protocol::{parse_line, Line};
//!
//! assert!(matches!(parse_line("000000042"), Ok(Line::Number(n)) if n.get() == 42));
//! assert_eq!(parse_line("terminate"), Ok(Line::Terminate));
//! assert!(parse_line("42").is_err());
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{ConfigError, ProtocolError, Result, UniqnumError};
pub use types::{ConnectionId, Number, ServerState};
