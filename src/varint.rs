//! Variable-length integer encoding (RFC 9000 Section 16).
//!
//! The top two bits of the first byte select a 1/2/4/8-byte encoding; the
//! remaining bits of the consumed bytes form the value, big-endian, masked
//! to 6/14/30/62 bits. Any value may legally be carried in a larger class
//! than it needs, so a decoded [`Varint`] remembers the class it came from
//! and exposes [`Varint::is_canonical`] as a derived property.

#![forbid(unsafe_code)]

use crate::error::{ErrorKind, Result};

/// Maximum representable value (2^62 - 1).
pub const VARINT_MAX: u64 = (1u64 << 62) - 1;

/// A decoded variable-length integer together with its wire length class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varint {
    /// The semantic value, in [0, 2^62 - 1].
    pub value: u64,
    /// Bytes consumed on the wire: 1, 2, 4, or 8.
    pub encoded_len: usize,
}

impl Varint {
    /// True iff the wire used the minimal length class for this value.
    pub fn is_canonical(&self) -> bool {
        self.encoded_len == encoded_len(self.value)
    }
}

/// Decode a varint from the front of `buf`.
///
/// Fails with [`ErrorKind::Truncated`] when the length class derived from
/// the first byte requires more bytes than remain.
pub fn decode(buf: &[u8]) -> Result<Varint> {
    let first = *buf.first().ok_or(ErrorKind::Truncated)?;

    let len = match first >> 6 {
        0b00 => 1,
        0b01 => 2,
        0b10 => 4,
        _ => 8,
    };
    if buf.len() < len {
        return Err(ErrorKind::Truncated);
    }

    let mut value = (first & 0x3f) as u64;
    for &b in &buf[1..len] {
        value = (value << 8) | b as u64;
    }

    Ok(Varint {
        value,
        encoded_len: len,
    })
}

/// Encode `value` into `buf` in its canonical (minimal) form.
///
/// Returns the bytes written, or `None` if `value` exceeds [`VARINT_MAX`]
/// or `buf` is too small.
pub fn encode(value: u64, buf: &mut [u8]) -> Option<usize> {
    if value > VARINT_MAX {
        return None;
    }

    let len = encoded_len(value);
    if buf.len() < len {
        return None;
    }

    match len {
        1 => buf[0] = value as u8,
        2 => {
            buf[0] = 0x40 | (value >> 8) as u8;
            buf[1] = value as u8;
        }
        4 => {
            buf[0] = 0x80 | (value >> 24) as u8;
            buf[1] = (value >> 16) as u8;
            buf[2] = (value >> 8) as u8;
            buf[3] = value as u8;
        }
        _ => {
            buf[0] = 0xc0 | (value >> 56) as u8;
            for (i, slot) in buf[1..8].iter_mut().enumerate() {
                *slot = (value >> (48 - 8 * i)) as u8;
            }
        }
    }

    Some(len)
}

/// The minimal encoded size for `value`.
pub fn encoded_len(value: u64) -> usize {
    if value < 0x40 {
        1
    } else if value < 0x4000 {
        2
    } else if value < 0x4000_0000 {
        4
    } else {
        8
    }
}
