//! Reader driver protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command opcodes
///
/// The values are fixed by the virtual reader driver and cannot be changed
/// without coordinating a protocol revision on the driver side. The driver
/// also emits a power-off opcode (0x01); it carries no payload and is
/// deliberately absent here so the dispatch loop ignores it like any other
/// unassigned opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Power the card up
    PowerOn = 0x00,

    /// Warm-reset the card
    Reset = 0x02,

    /// Request the answer-to-reset bytes
    GetAtr = 0x04,

    /// A command APDU follows as one payload frame
    Apdu = 0x0A,
}

impl Command {
    /// Commands that are followed by exactly one payload frame on the wire
    pub fn expects_payload(self) -> bool {
        matches!(self, Self::Apdu)
    }

    /// Commands the bridge answers with exactly one payload frame
    pub fn expects_response(self) -> bool {
        matches!(self, Self::GetAtr | Self::Apdu)
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::PowerOn => "CMD_POWER_ON",
            Self::Reset => "CMD_RESET",
            Self::GetAtr => "CMD_GET_ATR",
            Self::Apdu => "CMD_APDU",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::PowerOn),
            0x02 => Ok(Self::Reset),
            0x04 => Ok(Self::GetAtr),
            0x0A => Ok(Self::Apdu),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
