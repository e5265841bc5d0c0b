//! # vscard
//!
//! Bridge between a virtual smart-card reader driver and a card-processing
//! engine. The driver side speaks a length-prefixed TCP command protocol;
//! the engine side is anything implementing [`CardEngine`].
//!
//! ## Features
//!
//! - Framed TCP transport with operator-driven reconnect
//! - Concurrent dispatch and reconnect-control loops over one connection
//! - Cooperative shutdown on Ctrl-C
//!
//! ## Quick Start
//!
//! ```no_run
//! use vscard::{Bridge, Config, NullEngine};
//!
//! #[tokio::main]
//! async fn main() -> vscard::Result<()> {
//!     let config = Config::load("vscard.toml")?;
//!
//!     // Runs until the process is interrupted; type "r" to force a
//!     // fresh driver connection.
//!     Bridge::new(&config, Box::new(NullEngine)).run().await
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;

// Re-exports
pub use bridge::Bridge;
pub use config::Config;
pub use control::{LineSource, StdinLines, RECONNECT_SIGNAL};
pub use dispatch::DispatchLoop;
pub use engine::{CardEngine, NullEngine};
pub use error::{Error, Result};

// Re-export protocol types
pub use vscard_core::Command;
pub use vscard_transport::{TcpTransport, Transport};
