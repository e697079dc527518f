//! Cross-field and snapshot-relative frame validation.
//!
//! The grammar accepts anything structurally well-formed; this module holds
//! the rules that need more than one field, or connection state, to judge.
//! Validation is a pure function over an immutable [`ConnectionSnapshot`]:
//! the same frame against the same snapshot always yields the same verdict,
//! and the snapshot is never mutated.

#![forbid(unsafe_code)]

use crate::error::{ErrorKind, Result};
use crate::frames::types::{AckFrame, Frame, ResetStreamFrame, StreamFrame};
use crate::types::{Side, StreamId, MAX_STREAM_COUNT};
use crate::varint::VARINT_MAX;
use std::collections::BTreeMap;

/// What the validator knows about one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamView {
    /// Largest offset seen so far (offset + data length high-water mark).
    pub highwater: u64,
    /// Final size, once a FIN or RESET_STREAM established it.
    pub final_size: Option<u64>,
}

/// Read-only connection state the validator judges frames against.
///
/// A real connection owns and updates state like this as frames are
/// applied; here the snapshot is built up front (by a harness or a test)
/// and only read.
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    /// Which endpoint is receiving the frames under validation.
    pub side: Side,
    streams: BTreeMap<u64, StreamView>,
    highest_issued_cid_seq: Option<u64>,
}

impl ConnectionSnapshot {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            streams: BTreeMap::new(),
            highest_issued_cid_seq: None,
        }
    }

    /// Record known stream state: the high-water offset and, if
    /// established, the final size.
    pub fn record_stream(&mut self, id: StreamId, highwater: u64, final_size: Option<u64>) {
        self.streams.insert(
            id.value(),
            StreamView {
                highwater,
                final_size,
            },
        );
    }

    /// Record a connection ID sequence number this endpoint has issued.
    pub fn record_issued_cid_seq(&mut self, seq: u64) {
        self.highest_issued_cid_seq = Some(match self.highest_issued_cid_seq {
            Some(prev) => prev.max(seq),
            None => seq,
        });
    }

    pub fn stream(&self, id: StreamId) -> Option<&StreamView> {
        self.streams.get(&id.value())
    }
}

/// Validate a decoded frame against a connection snapshot.
///
/// Grammar-accepted frames with no cross-field rules pass trivially.
pub fn validate(frame: &Frame, snapshot: &ConnectionSnapshot) -> Result<()> {
    match frame {
        Frame::Ack(ack) => validate_ack(ack),
        Frame::Stream(stream) => validate_stream(stream, snapshot),
        Frame::ResetStream(reset) => validate_reset_stream(reset, snapshot),
        Frame::StopSending(ss) => {
            // STOP_SENDING asks us to stop sending; it is meaningless on a
            // stream we never send on (RFC 9000 19.5).
            if !ss.stream_id.can_send(snapshot.side) {
                return Err(ErrorKind::StreamStateViolation);
            }
            Ok(())
        }
        Frame::MaxStreamData(msd) => {
            // Flow-control credit for our sending side of the stream.
            if !msd.stream_id.can_send(snapshot.side) {
                return Err(ErrorKind::StreamStateViolation);
            }
            Ok(())
        }
        Frame::MaxStreams(ms) => {
            if ms.maximum_streams > MAX_STREAM_COUNT {
                return Err(ErrorKind::InvalidFieldValue);
            }
            Ok(())
        }
        Frame::StreamsBlocked(sb) => {
            if sb.limit > MAX_STREAM_COUNT {
                return Err(ErrorKind::InvalidFieldValue);
            }
            Ok(())
        }
        Frame::NewConnectionId(ncid) => {
            if ncid.retire_prior_to > ncid.sequence_number {
                return Err(ErrorKind::InvalidFieldValue);
            }
            Ok(())
        }
        Frame::RetireConnectionId(rcid) => {
            // Retiring a sequence number never issued (RFC 9000 19.16);
            // with nothing issued, every retirement is out of range.
            match snapshot.highest_issued_cid_seq {
                Some(highest) if rcid.sequence_number <= highest => Ok(()),
                _ => Err(ErrorKind::InvalidFieldValue),
            }
        }
        Frame::AckFrequency(af) => {
            if af.packet_tolerance == 0 {
                return Err(ErrorKind::InvalidFieldValue);
            }
            Ok(())
        }
        Frame::Bdp(bdp) => {
            // Saved address is IPv4 or IPv6, nothing else.
            if bdp.address.len() != 4 && bdp.address.len() != 16 {
                return Err(ErrorKind::InvalidFieldValue);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Walk the ACK ranges downward from the largest acknowledged packet
/// number. Every subtraction must stay at or above zero (RFC 9000 19.3.1).
fn validate_ack(ack: &AckFrame) -> Result<()> {
    let mut smallest = ack
        .largest_acked
        .checked_sub(ack.first_range)
        .ok_or(ErrorKind::InvalidAckRange)?;

    for range in &ack.ranges {
        // Gap encodes the unacknowledged run minus one, and the next
        // largest sits one below that run.
        let next_largest = smallest
            .checked_sub(range.gap)
            .and_then(|v| v.checked_sub(2))
            .ok_or(ErrorKind::InvalidAckRange)?;
        smallest = next_largest
            .checked_sub(range.length)
            .ok_or(ErrorKind::InvalidAckRange)?;
    }

    Ok(())
}

fn validate_stream(stream: &StreamFrame, snapshot: &ConnectionSnapshot) -> Result<()> {
    // The frame came from the peer; the peer must be allowed to send on
    // this stream (RFC 9000 Section 4.6 receive-only/send-only rules).
    if !stream.stream_id.can_send(snapshot.side.opposite()) {
        return Err(ErrorKind::StreamStateViolation);
    }

    let implied = stream
        .implied_size()
        .filter(|&size| size <= VARINT_MAX)
        .ok_or(ErrorKind::InvalidFieldValue)?;

    if let Some(view) = snapshot.stream(stream.stream_id) {
        if let Some(final_size) = view.final_size {
            // Data past an established final size, or a FIN moving it.
            if implied > final_size {
                return Err(ErrorKind::FinalSizeViolation);
            }
            if stream.fin && implied != final_size {
                return Err(ErrorKind::FinalSizeViolation);
            }
        } else if stream.fin && implied < view.highwater {
            // FIN would place the final size below data already received.
            return Err(ErrorKind::FinalSizeViolation);
        }
    }

    Ok(())
}

fn validate_reset_stream(reset: &ResetStreamFrame, snapshot: &ConnectionSnapshot) -> Result<()> {
    if !reset.stream_id.can_send(snapshot.side.opposite()) {
        return Err(ErrorKind::StreamStateViolation);
    }

    if let Some(view) = snapshot.stream(reset.stream_id) {
        if let Some(final_size) = view.final_size {
            if reset.final_size != final_size {
                return Err(ErrorKind::FinalSizeViolation);
            }
        } else if reset.final_size < view.highwater {
            return Err(ErrorKind::FinalSizeViolation);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::types::*;
    use bytes::Bytes;
    use tinyvec::TinyVec;

    fn server_snapshot() -> ConnectionSnapshot {
        ConnectionSnapshot::new(Side::Server)
    }

    fn ack(largest: u64, first: u64, ranges: &[(u64, u64)]) -> Frame {
        let mut tv: TinyVec<[AckRange; 8]> = TinyVec::new();
        for &(gap, length) in ranges {
            tv.push(AckRange { gap, length });
        }
        Frame::Ack(AckFrame {
            largest_acked: largest,
            ack_delay: 0,
            first_range: first,
            ranges: tv,
            ecn: None,
        })
    }

    fn stream(id: u64, offset: u64, data: &'static [u8], fin: bool) -> Frame {
        Frame::Stream(StreamFrame {
            stream_id: StreamId::new(id),
            offset,
            length: Some(data.len() as u64),
            fin,
            data: Bytes::from_static(data),
        })
    }

    mod ack_validation_tests {
        use super::*;

        #[test]
        fn test_first_range_exceeds_largest() {
            let frame = ack(5, 10, &[]);
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidAckRange)
            );
        }

        #[test]
        fn test_first_range_equal_to_largest_is_fine() {
            let frame = ack(5, 5, &[]);
            assert!(validate(&frame, &server_snapshot()).is_ok());
        }

        #[test]
        fn test_range_walk_underflow() {
            // smallest = 10 - 2 = 8; gap 3 needs 8 - 3 - 2 = 3, length 5
            // would land at -2.
            let frame = ack(10, 2, &[(3, 5)]);
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidAckRange)
            );
        }

        #[test]
        fn test_range_walk_to_zero_is_fine() {
            // smallest = 10 - 2 = 8; next largest = 8 - 0 - 2 = 6;
            // smallest = 6 - 6 = 0.
            let frame = ack(10, 2, &[(0, 6)]);
            assert!(validate(&frame, &server_snapshot()).is_ok());
        }

        #[test]
        fn test_gap_alone_can_underflow() {
            // smallest = 1; gap 0 needs 1 - 0 - 2.
            let frame = ack(1, 0, &[(0, 0)]);
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidAckRange)
            );
        }
    }

    mod stream_role_tests {
        use super::*;

        #[test]
        fn test_stream_on_receive_only_stream_rejected() {
            // Stream 3: server-initiated unidirectional. A server receiving
            // STREAM for it means the client sent on a stream it cannot.
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(3), 0, None);
            assert_eq!(
                validate(&stream(3, 0, b"x", false), &snapshot),
                Err(ErrorKind::StreamStateViolation)
            );
        }

        #[test]
        fn test_stream_from_proper_sender_accepted() {
            // Stream 2: client-initiated unidirectional, client sends,
            // server receives.
            assert!(validate(&stream(2, 0, b"x", false), &server_snapshot()).is_ok());
        }

        #[test]
        fn test_stop_sending_on_stream_we_never_send_on() {
            // Server receives STOP_SENDING for client uni stream 2: the
            // server has no sending part there.
            let frame = Frame::StopSending(StopSendingFrame {
                stream_id: StreamId::new(2),
                error_code: 0,
            });
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::StreamStateViolation)
            );
        }

        #[test]
        fn test_max_stream_data_for_our_sending_side() {
            // Server uni stream 3: server sends, so credit is meaningful.
            let frame = Frame::MaxStreamData(MaxStreamDataFrame {
                stream_id: StreamId::new(3),
                maximum_stream_data: 100,
            });
            assert!(validate(&frame, &server_snapshot()).is_ok());

            // Client uni stream 2: server never sends there.
            let frame = Frame::MaxStreamData(MaxStreamDataFrame {
                stream_id: StreamId::new(2),
                maximum_stream_data: 100,
            });
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::StreamStateViolation)
            );
        }

        #[test]
        fn test_bidi_streams_pass_both_role_checks() {
            let frame = Frame::StopSending(StopSendingFrame {
                stream_id: StreamId::new(0),
                error_code: 0,
            });
            assert!(validate(&frame, &server_snapshot()).is_ok());
            assert!(validate(&stream(0, 0, b"x", false), &server_snapshot()).is_ok());
        }
    }

    mod final_size_tests {
        use super::*;

        #[test]
        fn test_fin_below_highwater() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 100, None);
            // FIN at offset 10 + 5 bytes: final size 15 < 100 received.
            assert_eq!(
                validate(&stream(0, 10, b"hello", true), &snapshot),
                Err(ErrorKind::FinalSizeViolation)
            );
        }

        #[test]
        fn test_data_past_established_final_size() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 20, Some(20));
            assert_eq!(
                validate(&stream(0, 18, b"abc", false), &snapshot),
                Err(ErrorKind::FinalSizeViolation)
            );
        }

        #[test]
        fn test_fin_moving_final_size() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 20, Some(20));
            assert_eq!(
                validate(&stream(0, 0, b"abc", true), &snapshot),
                Err(ErrorKind::FinalSizeViolation)
            );
        }

        #[test]
        fn test_fin_restating_final_size() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 20, Some(20));
            // Retransmission of the closing frame: final size unchanged.
            let frame = Frame::Stream(StreamFrame {
                stream_id: StreamId::new(0),
                offset: 15,
                length: Some(5),
                fin: true,
                data: Bytes::from_static(b"tail!"),
            });
            assert!(validate(&frame, &snapshot).is_ok());
        }

        #[test]
        fn test_stream_offset_overflow() {
            let frame = Frame::Stream(StreamFrame {
                stream_id: StreamId::new(0),
                offset: VARINT_MAX,
                length: Some(1),
                fin: false,
                data: Bytes::from_static(b"x"),
            });
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_reset_final_size_below_highwater() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 100, None);
            let frame = Frame::ResetStream(ResetStreamFrame {
                stream_id: StreamId::new(0),
                error_code: 0,
                final_size: 50,
            });
            assert_eq!(
                validate(&frame, &snapshot),
                Err(ErrorKind::FinalSizeViolation)
            );
        }

        #[test]
        fn test_reset_changing_established_final_size() {
            let mut snapshot = server_snapshot();
            snapshot.record_stream(StreamId::new(0), 20, Some(20));
            let frame = Frame::ResetStream(ResetStreamFrame {
                stream_id: StreamId::new(0),
                error_code: 0,
                final_size: 21,
            });
            assert_eq!(
                validate(&frame, &snapshot),
                Err(ErrorKind::FinalSizeViolation)
            );
        }

        #[test]
        fn test_reset_on_unknown_stream_accepted() {
            let frame = Frame::ResetStream(ResetStreamFrame {
                stream_id: StreamId::new(0),
                error_code: 0,
                final_size: 5,
            });
            assert!(validate(&frame, &server_snapshot()).is_ok());
        }
    }

    mod bounds_tests {
        use super::*;

        #[test]
        fn test_max_streams_ceiling() {
            let at_limit = Frame::MaxStreams(MaxStreamsFrame {
                maximum_streams: MAX_STREAM_COUNT,
                bidirectional: true,
            });
            assert!(validate(&at_limit, &server_snapshot()).is_ok());

            let over = Frame::MaxStreams(MaxStreamsFrame {
                maximum_streams: MAX_STREAM_COUNT + 1,
                bidirectional: true,
            });
            assert_eq!(
                validate(&over, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_streams_blocked_ceiling() {
            let over = Frame::StreamsBlocked(StreamsBlockedFrame {
                limit: MAX_STREAM_COUNT + 1,
                bidirectional: false,
            });
            assert_eq!(
                validate(&over, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_retire_beyond_issued() {
            let frame = Frame::RetireConnectionId(RetireConnectionIdFrame {
                sequence_number: 5,
            });

            // Nothing issued: every retirement is invalid.
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );

            let mut snapshot = server_snapshot();
            snapshot.record_issued_cid_seq(5);
            assert!(validate(&frame, &snapshot).is_ok());

            snapshot.record_issued_cid_seq(4); // does not lower the highest
            assert!(validate(&frame, &snapshot).is_ok());
        }

        #[test]
        fn test_new_cid_retire_prior_beyond_sequence() {
            let frame = Frame::NewConnectionId(NewConnectionIdFrame {
                sequence_number: 2,
                retire_prior_to: 3,
                connection_id: Bytes::from_static(&[0xab; 8]),
                stateless_reset_token: [0; 16],
            });
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_ack_frequency_zero_tolerance() {
            let frame = Frame::AckFrequency(AckFrequencyFrame {
                sequence_number: 0,
                packet_tolerance: 0,
                update_max_ack_delay: 10,
                reordering_threshold: 1,
            });
            assert_eq!(
                validate(&frame, &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_bdp_address_lengths() {
            let make = |len: usize| {
                Frame::Bdp(BdpFrame {
                    lifetime: 1,
                    bytes_in_flight: 1,
                    min_rtt: 1,
                    address: Bytes::from(vec![0u8; len]),
                })
            };
            assert!(validate(&make(4), &server_snapshot()).is_ok());
            assert!(validate(&make(16), &server_snapshot()).is_ok());
            assert_eq!(
                validate(&make(5), &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
            assert_eq!(
                validate(&make(0), &server_snapshot()),
                Err(ErrorKind::InvalidFieldValue)
            );
        }

        #[test]
        fn test_stateless_frames_pass() {
            for frame in [Frame::Padding, Frame::Ping, Frame::HandshakeDone] {
                assert!(validate(&frame, &server_snapshot()).is_ok());
            }
        }
    }
}
