//! Reconnect control loop
//!
//! Lets an operator force a fresh driver connection without restarting the
//! process, even while the dispatch loop is blocked mid-read. The reconnect
//! acts on the transport directly; the dispatch loop observes one failed
//! read and carries on against the new connection.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vscard_transport::Transport;

/// Operator input that triggers a reconnect; everything else is ignored
pub const RECONNECT_SIGNAL: &str = "r";

/// Source of operator command lines
///
/// Production reads stdin; tests feed lines programmatically.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Next line, `None` once the source is exhausted
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Operator lines from standard input
pub struct StdinLines {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinLines {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// The operator-driven reconnect loop
///
/// Reads one operator line per iteration; a failed reconnect is reported and
/// not retried until the operator signals again. Only its cancellation token
/// stops it.
pub struct ControlLoop {
    transport: Arc<dyn Transport>,
    lines: Box<dyn LineSource>,
    shutdown: CancellationToken,
}

impl ControlLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        lines: Box<dyn LineSource>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            lines,
            shutdown,
        }
    }

    /// Run until the cancellation token fires
    pub async fn run(mut self) {
        info!(
            "Listening for operator commands (\"{}\" reconnects)",
            RECONNECT_SIGNAL
        );

        while !self.shutdown.is_cancelled() {
            let line = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                line = self.lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) if line == RECONNECT_SIGNAL => self.reconnect().await,
                Ok(Some(_)) => {}
                Ok(None) => {
                    // No more operator input will ever arrive; park here so
                    // the loop still stops through its token
                    debug!("Operator channel closed");
                    self.shutdown.cancelled().await;
                    break;
                }
                Err(e) => warn!("Failed to read operator command: {}", e),
            }
        }

        info!("Reconnect control stopped");
    }

    async fn reconnect(&self) {
        info!("Resetting connection to {}...", self.transport.remote_addr());

        match self.transport.reconnect().await {
            Ok(()) => info!("Connection was reset"),
            Err(e) => warn!(
                "Reconnect failed, signal \"{}\" to retry: {}",
                RECONNECT_SIGNAL, e
            ),
        }
    }
}
