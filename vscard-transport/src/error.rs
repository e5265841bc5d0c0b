//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] vscard_core::Error),
}

impl Error {
    /// Check if the error means the connection itself is gone
    ///
    /// Distinguishes connection loss (the peer vanished or the connection was
    /// replaced under us) from bad data on an otherwise healthy connection.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectionClosed | Self::Io(_)
        )
    }
}
