//! # uniqnum
//!
//! TCP server that accepts up to a fixed number of concurrent clients, each
//! streaming 9-digit decimal numbers one per line. Numbers are deduplicated
//! server-wide; each first-seen number is logged, and a periodic report
//! summarizes unique and duplicate counts. Any client sending `terminate`
//! shuts the whole server down.
//!
//! ## Example
//!
//! ```no_run
//! use uniqnum::{ListenerConfig, Server};
//!
//! # async fn example() -> uniqnum_core::Result<()> {
//! let server = Server::bind(ListenerConfig::default()).await?;
//! let summary = server.run().await?;
//! println!("{}", summary.final_report);
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod logging;
pub mod server_listener;
pub mod shutdown;

pub use handler::{ConnectionExit, ConnectionHandler, LineOutcome, NUMBERS_TARGET};
pub use logging::init_logging;
pub use server_listener::{ListenerConfig, Server, ShutdownSummary};
pub use shutdown::ShutdownCoordinator;
