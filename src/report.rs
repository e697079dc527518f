//! Outcome reporting: one terminal state per frame attempt.
//!
//! [`process_frame`] composes the grammar and the validator into a single
//! verdict, with `tracing` diagnostics along the way. The library never
//! installs a subscriber; harnesses pick their own.

#![forbid(unsafe_code)]

use crate::error::{Advisories, ErrorKind};
use crate::frames::{Frame, FrameDecoder};
use crate::validate::{validate, ConnectionSnapshot};
use tracing::{debug, trace};

/// Terminal state of one frame attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The frame decoded and validated; advisories may be attached.
    Accepted {
        frame: Frame,
        /// Bytes consumed from the packet payload.
        consumed: usize,
        advisories: Advisories,
    },
    /// The frame was rejected; the attempt consumed nothing.
    Rejected(ErrorKind),
}

impl DecodeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DecodeOutcome::Accepted { .. })
    }

    /// The rejection, if this attempt was rejected.
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            DecodeOutcome::Accepted { .. } => None,
            DecodeOutcome::Rejected(kind) => Some(*kind),
        }
    }

    /// The RFC 9000 Section 20.1 code a CONNECTION_CLOSE would carry, if
    /// this attempt was rejected.
    pub fn transport_error_code(&self) -> Option<u64> {
        self.error().map(|kind| kind.transport_error_code())
    }
}

/// Decode the frame at the front of `buf`, then validate it against
/// `snapshot`. Both steps funnel into one [`DecodeOutcome`].
pub fn process_frame(
    decoder: &FrameDecoder,
    buf: &[u8],
    packet_len: usize,
    snapshot: &ConnectionSnapshot,
) -> DecodeOutcome {
    let (frame, consumed, advisories) = match decoder.decode_frame(buf, packet_len) {
        Ok(decoded) => decoded,
        Err(kind) => {
            debug!(error = %kind, "frame rejected by grammar");
            return DecodeOutcome::Rejected(kind);
        }
    };

    if let Err(kind) = validate(&frame, snapshot) {
        debug!(
            frame_type = frame.frame_type(),
            error = %kind,
            "frame rejected by validator"
        );
        return DecodeOutcome::Rejected(kind);
    }

    for advisory in &advisories {
        debug!(?advisory, "advisory on accepted frame");
    }
    trace!(
        frame_type = frame.frame_type(),
        consumed,
        ack_eliciting = frame.is_ack_eliciting(),
        "frame accepted"
    );

    DecodeOutcome::Accepted {
        frame,
        consumed,
        advisories,
    }
}
