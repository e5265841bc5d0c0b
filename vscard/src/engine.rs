//! Card engine seam
//!
//! The bridge hands command APDUs to a card engine and relays its responses;
//! the engine itself (applets, card memory, crypto) lives outside this crate.

use bytes::Bytes;

/// Card-processing engine driven by the dispatch loop
///
/// Implementations interpret command APDUs and maintain whatever card state
/// they need. The bridge calls these operations one at a time from a single
/// task and never inspects the bytes it relays.
pub trait CardEngine: Send {
    /// Re-initialize card state (driver power-on or reset)
    fn reset(&mut self);

    /// Current answer-to-reset bytes
    fn atr(&self) -> Bytes;

    /// Process one command APDU and produce the response APDU
    fn dispatch_apdu(&mut self, apdu: &[u8]) -> anyhow::Result<Bytes>;
}

/// TS, T0 (TD1 present, no historical bytes), TD1 (T=1), TCK
const NULL_ATR: &[u8] = &[0x3B, 0x80, 0x01, 0x81];

/// Status word: instruction code not supported
const SW_INS_NOT_SUPPORTED: &[u8] = &[0x6D, 0x00];

/// Minimal placeholder engine
///
/// Reports a bare T=1 ATR and answers every APDU with status word `6D00`
/// (instruction not supported). Stands in until a real engine is wired up
/// through [`CardEngine`].
#[derive(Debug, Default)]
pub struct NullEngine;

impl CardEngine for NullEngine {
    fn reset(&mut self) {}

    fn atr(&self) -> Bytes {
        Bytes::from_static(NULL_ATR)
    }

    fn dispatch_apdu(&mut self, _apdu: &[u8]) -> anyhow::Result<Bytes> {
        Ok(Bytes::from_static(SW_INS_NOT_SUPPORTED))
    }
}
