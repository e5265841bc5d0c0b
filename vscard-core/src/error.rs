//! Error types for vscard-core



/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wire protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opcode byte outside the assigned command set
    #[error("Unknown command opcode: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Payload exceeds what the length prefix can carry
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Frame is shorter than its declared length
    #[error("Frame truncated: expected {expected} payload bytes, got {actual}")]
    FrameTruncated {
        expected: usize,
        actual: usize,
    },
}
