//! Length-prefixed payload framing
//!
//! Every payload on the wire is framed as a 2-byte big-endian length followed
//! by exactly that many raw bytes. No compression, no checksum.
//!
//! ```text
//! ┌─────────────┬─────────────┐
//! │   Length    │   Payload   │
//! │   2 bytes   │   N bytes   │
//! │  (BE u16)   │   (bytes)   │
//! └─────────────┴─────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use vscard_core::frame;
//!
//! let framed = frame::encode(&[0x90, 0x00]).unwrap();
//! assert_eq!(framed.as_ref(), &[0x00, 0x02, 0x90, 0x00]);
//!
//! let payload = frame::decode(framed.freeze()).unwrap();
//! assert_eq!(payload.as_ref(), &[0x90, 0x00]);
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::{LENGTH_SIZE, MAX_PAYLOAD_SIZE};

/// Encode a payload as one wire frame
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] when the payload does not fit the
/// 16-bit length prefix.
pub fn encode(payload: &[u8]) -> Result<BytesMut> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(LENGTH_SIZE + payload.len());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);

    Ok(buf)
}

/// Decode one complete wire frame back into its payload
///
/// # Errors
///
/// Returns [`Error::FrameTruncated`] when the buffer holds fewer bytes than
/// the length prefix declares (or no length prefix at all).
pub fn decode(mut buf: Bytes) -> Result<Bytes> {
    if buf.len() < LENGTH_SIZE {
        return Err(Error::FrameTruncated {
            expected: LENGTH_SIZE,
            actual: buf.len(),
        });
    }

    let len = buf.get_u16() as usize;
    if buf.len() < len {
        return Err(Error::FrameTruncated {
            expected: len,
            actual: buf.len(),
        });
    }

    Ok(buf.split_to(len))
}

/// Decode a length prefix read off the wire
pub fn payload_len(prefix: [u8; LENGTH_SIZE]) -> usize {
    u16::from_be_bytes(prefix) as usize
}
