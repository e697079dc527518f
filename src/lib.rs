//! # quidec
//!
//! Wire-format decoder and validator for QUIC transport frames
//! (RFC 9000 Section 19), built to be driven frame-by-frame by an external
//! harness over pre-encoded byte vectors.
//!
//! The crate splits the work in two:
//!
//! - the grammar ([`FrameDecoder`]) turns bytes into typed [`Frame`]s,
//!   checking only per-field structure;
//! - the validator ([`validate`]) checks cross-field invariants against a
//!   read-only [`ConnectionSnapshot`].
//!
//! Every attempt ends in exactly one of two states: an accepted frame,
//! possibly carrying [`Advisory`] notes (a non-minimal varint encoding is
//! legal and merely noted), or one member of the closed [`ErrorKind`]
//! taxonomy. [`process_frame`] composes both steps into a [`DecodeOutcome`].
//!
//! ```
//! use quidec::{process_frame, ConnectionSnapshot, DecodeOutcome, Frame, FrameDecoder, Side};
//!
//! let decoder = FrameDecoder::new();
//! let snapshot = ConnectionSnapshot::new(Side::Server);
//!
//! // RESET_STREAM: stream 17, error code 1, final size 1.
//! let buf = [0x04, 0x11, 0x01, 0x01];
//! match process_frame(&decoder, &buf, buf.len(), &snapshot) {
//!     DecodeOutcome::Accepted { frame, consumed, .. } => {
//!         assert!(matches!(frame, Frame::ResetStream(_)));
//!         assert_eq!(consumed, 4);
//!     }
//!     DecodeOutcome::Rejected(kind) => panic!("rejected: {kind}"),
//! }
//! ```
//!
//! Out of scope: packet protection, handshake state, corpus scheduling, and
//! anything above the transport frame layer.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod frames;
pub mod report;
pub mod types;
pub mod validate;
pub mod varint;

pub use config::DecoderConfig;
pub use error::{Advisories, Advisory, ErrorKind, Result};
pub use frames::{Frame, FrameDecoder};
pub use report::{process_frame, DecodeOutcome};
pub use types::{Side, StreamId};
pub use validate::{validate, ConnectionSnapshot, StreamView};
pub use varint::{Varint, VARINT_MAX};
