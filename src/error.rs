//! Error taxonomy for frame decoding and validation.
//!
//! Every attempt to decode a frame terminates in exactly one of two states:
//! an accepted frame (possibly carrying advisories) or one of the closed set
//! of error kinds below. Advisories are observations about *accepted* frames
//! and are never errors; in particular a legal-but-non-minimal varint
//! encoding decodes successfully and is merely noted.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type for decode and validation operations.
pub type Result<T> = core::result::Result<T, ErrorKind>;

/// Reasons a frame is rejected.
///
/// The set is closed: the decoder and validator produce nothing outside it.
/// Length mismatches of every flavor (declared length exceeding the buffer,
/// a field cut off mid-encoding, a missing fixed-size trailer) are all
/// `Truncated` — there is no resync or partial acceptance within a frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not enough bytes for a declared or implied field.
    #[error("not enough bytes for a declared or implied field")]
    Truncated,

    /// A field value lies outside its protocol-defined range
    /// (e.g. connection ID length 0 or 21, stream count above 2^60).
    #[error("field value outside its protocol-defined range")]
    InvalidFieldValue,

    /// ACK gap/range arithmetic implies a packet number below zero.
    #[error("ACK range arithmetic implies a packet number below zero")]
    InvalidAckRange,

    /// A stream's final size shrank or changed after being established.
    #[error("stream final size shrank or changed")]
    FinalSizeViolation,

    /// A frame was directed at a stream its sender may not use this way.
    #[error("frame directed at a stream its sender may not use this way")]
    StreamStateViolation,

    /// The leading type identifier is not one this decoder recognizes.
    /// The value is preserved so a higher layer can size-account and skip
    /// unknown-but-legal types if it chooses to.
    #[error("unrecognized frame type 0x{0:x}")]
    UnknownFrameType(u64),
}

impl ErrorKind {
    /// The RFC 9000 Section 20.1 transport error code a connection would
    /// carry in a CONNECTION_CLOSE triggered by this rejection.
    pub fn transport_error_code(&self) -> u64 {
        match self {
            ErrorKind::Truncated => 0x07,               // FRAME_ENCODING_ERROR
            ErrorKind::InvalidFieldValue => 0x07,       // FRAME_ENCODING_ERROR
            ErrorKind::InvalidAckRange => 0x07,         // FRAME_ENCODING_ERROR
            ErrorKind::FinalSizeViolation => 0x06,      // FINAL_SIZE_ERROR
            ErrorKind::StreamStateViolation => 0x05,    // STREAM_STATE_ERROR
            ErrorKind::UnknownFrameType(_) => 0x07,     // FRAME_ENCODING_ERROR
        }
    }

    /// True if the rejection came from running out of bytes rather than
    /// from the bytes' content.
    pub fn is_truncation(&self) -> bool {
        matches!(self, ErrorKind::Truncated)
    }
}

/// Non-fatal observation attached to an accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// A varint field used a longer length class than its value needs.
    /// Legal per RFC 9000 Section 16, but interesting to fuzz harnesses.
    NonCanonicalVarint {
        /// Name of the field as the grammar knows it ("type", "stream_id", ...).
        field: &'static str,
        /// Length class actually used on the wire (2, 4, or 8).
        encoded_len: usize,
    },
}

/// Advisory list attached to an accepted decode.
pub type Advisories = Vec<Advisory>;
