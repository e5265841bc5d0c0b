//! Bridge lifecycle
//!
//! Starts the dispatch and reconnect-control loops around one shared
//! transport and coordinates their shutdown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use vscard_transport::{TcpTransport, Transport};

use crate::config::Config;
use crate::control::{ControlLoop, LineSource, StdinLines};
use crate::dispatch::DispatchLoop;
use crate::engine::CardEngine;
use crate::error::Result;

/// The protocol bridge
///
/// Wires one card engine to one reader driver connection and supervises the
/// two worker loops that share it.
pub struct Bridge {
    transport: Arc<dyn Transport>,
    engine: Box<dyn CardEngine>,
    lines: Box<dyn LineSource>,
}

impl Bridge {
    /// Create a bridge for the driver endpoint in `config`
    pub fn new(config: &Config, engine: Box<dyn CardEngine>) -> Self {
        Self {
            transport: Arc::new(TcpTransport::new(config.host.clone(), config.port)),
            engine,
            lines: Box::new(StdinLines::new()),
        }
    }

    /// Replace the operator input source (stdin by default)
    pub fn with_line_source(mut self, lines: Box<dyn LineSource>) -> Self {
        self.lines = lines;
        self
    }

    /// Connect and run both loops until the process is asked to terminate
    ///
    /// A failed initial connect is fatal. Once running, connection loss is
    /// recovered inside the loops and this only returns after Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let Self {
            transport,
            engine,
            lines,
        } = self;

        transport.connect().await?;
        info!("Connected to reader driver at {}", transport.remote_addr());

        let dispatch_stop = CancellationToken::new();
        let control_stop = CancellationToken::new();

        let dispatch = DispatchLoop::new(Arc::clone(&transport), engine, dispatch_stop.clone());
        let control = ControlLoop::new(Arc::clone(&transport), lines, control_stop.clone());

        let dispatch_task = tokio::spawn(dispatch.run());
        let control_task = tokio::spawn(control.run());

        tokio::signal::ctrl_c().await?;

        info!("Shutdown connections");
        dispatch_stop.cancel();
        control_stop.cancel();
        transport.disconnect().await;

        // Joining is cleanliness, not correctness; both loops stop on their
        // own once the tokens fire and the connection is gone
        let _ = dispatch_task.await;
        let _ = control_task.await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullEngine;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_run_fails_without_driver() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config {
            host: addr.ip().to_string(),
            port: addr.port(),
        };

        let bridge = Bridge::new(&config, Box::new(NullEngine));
        assert!(bridge.run().await.is_err());
    }
}
