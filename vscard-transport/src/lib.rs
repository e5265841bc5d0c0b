//! Transport layer for the virtual reader driver protocol
//!
//! Owns the single TCP connection to the reader driver and implements the
//! framed read/write operations on top of it.

pub mod error;
pub mod tcp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use bytes::Bytes;

/// Driver-side transport operations
///
/// Implementations hand out one logical connection at a time and must keep
/// the internal connection swap performed by [`reconnect`](Transport::reconnect)
/// atomic with respect to readers blocked in [`read_command`](Transport::read_command)
/// or [`read_data`](Transport::read_data): such a read observes a single
/// connection-closed failure and the next call operates on the new connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection to the driver
    async fn connect(&self) -> Result<()>;

    /// Close the active connection, if any
    ///
    /// Idempotent; also unblocks any read or write currently pending on the
    /// connection.
    async fn disconnect(&self);

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Read one command opcode
    async fn read_command(&self) -> Result<u8>;

    /// Read one length-prefixed payload
    async fn read_data(&self) -> Result<Bytes>;

    /// Write one length-prefixed payload
    async fn write_data(&self, data: &[u8]) -> Result<()>;

    /// Get remote address
    fn remote_addr(&self) -> String;

    /// Tear down the connection and dial the same peer again
    ///
    /// On failure the transport is left unconnected; reads and writes fail
    /// until a later reconnect succeeds.
    async fn reconnect(&self) -> Result<()> {
        self.disconnect().await;
        self.connect().await
    }
}
