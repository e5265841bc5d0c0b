//! Command dispatch loop

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use vscard_core::Command;
use vscard_transport::Transport;

use crate::engine::CardEngine;
use crate::error::Result;

/// Delay before retrying after a read on a dead or absent connection, so a
/// reconnect window is not a busy loop
const READ_RETRY_DELAY: Duration = Duration::from_millis(100);

/// The request/response cycle with the card engine
///
/// Reads one command per iteration and answers it. Every per-iteration
/// failure (connection, protocol, engine) is logged and the loop moves on;
/// only its cancellation token stops it.
pub struct DispatchLoop {
    transport: Arc<dyn Transport>,
    engine: Box<dyn CardEngine>,
    shutdown: CancellationToken,
}

impl DispatchLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        engine: Box<dyn CardEngine>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            engine,
            shutdown,
        }
    }

    /// Run until the cancellation token fires
    pub async fn run(mut self) {
        info!("Command dispatch started");

        while !self.shutdown.is_cancelled() {
            let opcode = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                res = self.transport.read_command() => match res {
                    Ok(opcode) => opcode,
                    Err(e) => {
                        if self.shutdown.is_cancelled() {
                            debug!("Read aborted by shutdown: {}", e);
                            break;
                        }
                        warn!("Failed to read command: {}", e);
                        if e.is_connection_lost() {
                            tokio::time::sleep(READ_RETRY_DELAY).await;
                        }
                        continue;
                    }
                },
            };

            if let Err(e) = self.handle(opcode).await {
                warn!("Command 0x{:02X} failed: {}", opcode, e);
            }
        }

        info!("Command dispatch stopped");
    }

    /// Answer a single command
    async fn handle(&mut self, opcode: u8) -> Result<()> {
        let command = match Command::try_from(opcode) {
            Ok(command) => command,
            Err(_) => {
                // Unassigned opcodes (e.g. the driver's power-off) are not an
                // error; skip to the next command
                trace!("Ignoring unassigned opcode 0x{:02X}", opcode);
                return Ok(());
            }
        };

        debug!("Dispatching {}", command);

        match command {
            Command::PowerOn | Command::Reset => self.engine.reset(),
            Command::GetAtr => {
                let atr = self.engine.atr();
                self.transport.write_data(&atr).await?;
            }
            Command::Apdu => {
                let apdu = self.transport.read_data().await?;
                debug!("Command APDU: {}", hex::encode(&apdu));

                let reply = self.engine.dispatch_apdu(&apdu)?;
                debug!("Response APDU: {}", hex::encode(&reply));

                self.transport.write_data(&reply).await?;
            }
        }

        Ok(())
    }
}
