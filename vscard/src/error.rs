//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Core(#[from] vscard_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] vscard_transport::Error),

    /// Failure inside the card engine; opaque to the bridge
    #[error(transparent)]
    Engine(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
