//! QUIC frame types (RFC 9000 Section 19) and the extensions the corpus
//! exercises: DATAGRAM (RFC 9221), ACK_FREQUENCY and TIME_STAMP
//! (draft-ietf-quic-ack-frequency), the multipath path-management frames
//! (draft-ietf-quic-multipath), and the BDP resume extension.
//!
//! Each variant owns exactly the fields its grammar defines; byte payloads
//! are owned `Bytes`, never references into the packet buffer.

#![forbid(unsafe_code)]

use crate::types::StreamId;
use bytes::Bytes;
use tinyvec::TinyVec;

/// Frame type identifiers. The identifier is itself a varint, so values
/// above 0x3f occupy more than one byte on the wire.
pub const FRAME_TYPE_PADDING: u64 = 0x00;
pub const FRAME_TYPE_PING: u64 = 0x01;
pub const FRAME_TYPE_ACK: u64 = 0x02;
pub const FRAME_TYPE_ACK_ECN: u64 = 0x03;
pub const FRAME_TYPE_RESET_STREAM: u64 = 0x04;
pub const FRAME_TYPE_STOP_SENDING: u64 = 0x05;
pub const FRAME_TYPE_CRYPTO: u64 = 0x06;
pub const FRAME_TYPE_NEW_TOKEN: u64 = 0x07;
pub const FRAME_TYPE_STREAM_BASE: u64 = 0x08; // 0x08-0x0f
pub const FRAME_TYPE_MAX_DATA: u64 = 0x10;
pub const FRAME_TYPE_MAX_STREAM_DATA: u64 = 0x11;
pub const FRAME_TYPE_MAX_STREAMS_BIDI: u64 = 0x12;
pub const FRAME_TYPE_MAX_STREAMS_UNI: u64 = 0x13;
pub const FRAME_TYPE_DATA_BLOCKED: u64 = 0x14;
pub const FRAME_TYPE_STREAM_DATA_BLOCKED: u64 = 0x15;
pub const FRAME_TYPE_STREAMS_BLOCKED_BIDI: u64 = 0x16;
pub const FRAME_TYPE_STREAMS_BLOCKED_UNI: u64 = 0x17;
pub const FRAME_TYPE_NEW_CONNECTION_ID: u64 = 0x18;
pub const FRAME_TYPE_RETIRE_CONNECTION_ID: u64 = 0x19;
pub const FRAME_TYPE_PATH_CHALLENGE: u64 = 0x1a;
pub const FRAME_TYPE_PATH_RESPONSE: u64 = 0x1b;
pub const FRAME_TYPE_CONNECTION_CLOSE_TRANSPORT: u64 = 0x1c;
pub const FRAME_TYPE_CONNECTION_CLOSE_APP: u64 = 0x1d;
pub const FRAME_TYPE_HANDSHAKE_DONE: u64 = 0x1e;
pub const FRAME_TYPE_DATAGRAM: u64 = 0x30;
pub const FRAME_TYPE_DATAGRAM_LEN: u64 = 0x31;
pub const FRAME_TYPE_ACK_FREQUENCY: u64 = 0xaf;
pub const FRAME_TYPE_TIME_STAMP: u64 = 0x02f5;
pub const FRAME_TYPE_PATH_ABANDON: u64 = 0x15228c05;
pub const FRAME_TYPE_PATH_BACKUP: u64 = 0x15228c07;
pub const FRAME_TYPE_PATH_AVAILABLE: u64 = 0x15228c08;
pub const FRAME_TYPE_PATHS_BLOCKED: u64 = 0x15228c0d;
pub const FRAME_TYPE_BDP: u64 = 0xebd9;

/// STREAM frame flag bits carried in the type byte (RFC 9000 Section 19.8).
pub const STREAM_FRAME_BIT_FIN: u64 = 0x01;
pub const STREAM_FRAME_BIT_LEN: u64 = 0x02;
pub const STREAM_FRAME_BIT_OFF: u64 = 0x04;

/// ACK frame (RFC 9000 Section 19.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    /// Largest packet number being acknowledged.
    pub largest_acked: u64,
    /// Delay in raw units; exponent scaling is the caller's concern.
    pub ack_delay: u64,
    /// Packets acknowledged immediately below `largest_acked`.
    pub first_range: u64,
    /// Further (gap, length) pairs walking downward.
    pub ranges: TinyVec<[AckRange; 8]>,
    /// ECN counts, present only in the ACK_ECN (0x03) variant.
    pub ecn: Option<EcnCounts>,
}

/// One (Gap, ACK Range Length) pair (RFC 9000 Section 19.3.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckRange {
    pub gap: u64,
    pub length: u64,
}

/// ECN counters (RFC 9000 Section 19.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcnCounts {
    pub ect0: u64,
    pub ect1: u64,
    pub ce: u64,
}

/// RESET_STREAM frame (RFC 9000 Section 19.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetStreamFrame {
    pub stream_id: StreamId,
    pub error_code: u64,
    pub final_size: u64,
}

/// STOP_SENDING frame (RFC 9000 Section 19.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopSendingFrame {
    pub stream_id: StreamId,
    pub error_code: u64,
}

/// CRYPTO frame (RFC 9000 Section 19.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoFrame {
    pub offset: u64,
    pub data: Bytes,
}

/// NEW_TOKEN frame (RFC 9000 Section 19.7). The token is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTokenFrame {
    pub token: Bytes,
}

/// STREAM frame (RFC 9000 Section 19.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub stream_id: StreamId,
    /// Byte offset in the stream; 0 when the OFF bit is unset.
    pub offset: u64,
    /// Explicit length field, or `None` when the frame extends to the end
    /// of the packet (LEN bit unset).
    pub length: Option<u64>,
    pub fin: bool,
    pub data: Bytes,
}

impl StreamFrame {
    /// The stream size this frame implies: offset plus carried data.
    pub fn implied_size(&self) -> Option<u64> {
        self.offset.checked_add(self.data.len() as u64)
    }
}

/// MAX_DATA frame (RFC 9000 Section 19.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxDataFrame {
    pub maximum_data: u64,
}

/// MAX_STREAM_DATA frame (RFC 9000 Section 19.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxStreamDataFrame {
    pub stream_id: StreamId,
    pub maximum_stream_data: u64,
}

/// MAX_STREAMS frame, both kinds (RFC 9000 Section 19.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxStreamsFrame {
    pub maximum_streams: u64,
    pub bidirectional: bool,
}

/// DATA_BLOCKED frame (RFC 9000 Section 19.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockedFrame {
    pub limit: u64,
}

/// STREAM_DATA_BLOCKED frame (RFC 9000 Section 19.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDataBlockedFrame {
    pub stream_id: StreamId,
    pub limit: u64,
}

/// STREAMS_BLOCKED frame, both kinds (RFC 9000 Section 19.14).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamsBlockedFrame {
    pub limit: u64,
    pub bidirectional: bool,
}

/// NEW_CONNECTION_ID frame (RFC 9000 Section 19.15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnectionIdFrame {
    pub sequence_number: u64,
    pub retire_prior_to: u64,
    /// 1 to 20 bytes; the grammar rejects anything else.
    pub connection_id: Bytes,
    pub stateless_reset_token: [u8; 16],
}

/// RETIRE_CONNECTION_ID frame (RFC 9000 Section 19.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetireConnectionIdFrame {
    pub sequence_number: u64,
}

/// PATH_CHALLENGE frame (RFC 9000 Section 19.17).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathChallengeFrame {
    pub data: [u8; 8],
}

/// PATH_RESPONSE frame (RFC 9000 Section 19.18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResponseFrame {
    pub data: [u8; 8],
}

/// CONNECTION_CLOSE frame, both 0x1c and 0x1d (RFC 9000 Section 19.19).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCloseFrame {
    pub error_code: u64,
    /// Offending frame type; present only in the transport (0x1c) variant.
    pub frame_type: Option<u64>,
    /// UTF-8 expected but not enforced here.
    pub reason: Bytes,
    /// True for the application (0x1d) variant.
    pub application: bool,
}

/// DATAGRAM frame (RFC 9221).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatagramFrame {
    /// Explicit length field, or `None` when the datagram extends to the
    /// end of the packet (type 0x30).
    pub length: Option<u64>,
    pub data: Bytes,
}

/// ACK_FREQUENCY frame (draft-ietf-quic-ack-frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrequencyFrame {
    pub sequence_number: u64,
    /// Must be non-zero; the validator rejects zero.
    pub packet_tolerance: u64,
    pub update_max_ack_delay: u64,
    pub reordering_threshold: u64,
}

/// TIME_STAMP frame (draft-huitema-quic-ts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStampFrame {
    pub timestamp: u64,
}

/// PATH_ABANDON frame (draft-ietf-quic-multipath).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAbandonFrame {
    pub path_id: u64,
    pub error_code: u64,
}

/// PATH_BACKUP / PATH_AVAILABLE payload (draft-ietf-quic-multipath).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStatusFrame {
    pub path_id: u64,
    pub status_sequence: u64,
}

/// PATHS_BLOCKED frame (draft-ietf-quic-multipath).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathsBlockedFrame {
    pub maximum_paths: u64,
}

/// BDP resume frame (draft-kuhn-quic-bdpframe-extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdpFrame {
    pub lifetime: u64,
    pub bytes_in_flight: u64,
    pub min_rtt: u64,
    /// Saved peer address, 4 (IPv4) or 16 (IPv6) bytes once validated.
    pub address: Bytes,
}

/// Tagged union over every frame kind this decoder understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// PADDING (0x00); a run of padding bytes decodes as one frame.
    Padding,
    /// PING (0x01)
    Ping,
    /// ACK (0x02) or ACK_ECN (0x03), distinguished by `ecn`
    Ack(AckFrame),
    /// RESET_STREAM (0x04)
    ResetStream(ResetStreamFrame),
    /// STOP_SENDING (0x05)
    StopSending(StopSendingFrame),
    /// CRYPTO (0x06)
    Crypto(CryptoFrame),
    /// NEW_TOKEN (0x07)
    NewToken(NewTokenFrame),
    /// STREAM (0x08-0x0f)
    Stream(StreamFrame),
    /// MAX_DATA (0x10)
    MaxData(MaxDataFrame),
    /// MAX_STREAM_DATA (0x11)
    MaxStreamData(MaxStreamDataFrame),
    /// MAX_STREAMS (0x12 or 0x13)
    MaxStreams(MaxStreamsFrame),
    /// DATA_BLOCKED (0x14)
    DataBlocked(DataBlockedFrame),
    /// STREAM_DATA_BLOCKED (0x15)
    StreamDataBlocked(StreamDataBlockedFrame),
    /// STREAMS_BLOCKED (0x16 or 0x17)
    StreamsBlocked(StreamsBlockedFrame),
    /// NEW_CONNECTION_ID (0x18)
    NewConnectionId(NewConnectionIdFrame),
    /// RETIRE_CONNECTION_ID (0x19)
    RetireConnectionId(RetireConnectionIdFrame),
    /// PATH_CHALLENGE (0x1a)
    PathChallenge(PathChallengeFrame),
    /// PATH_RESPONSE (0x1b)
    PathResponse(PathResponseFrame),
    /// CONNECTION_CLOSE (0x1c or 0x1d)
    ConnectionClose(ConnectionCloseFrame),
    /// HANDSHAKE_DONE (0x1e)
    HandshakeDone,
    /// DATAGRAM (0x30 or 0x31)
    Datagram(DatagramFrame),
    /// ACK_FREQUENCY (0xaf)
    AckFrequency(AckFrequencyFrame),
    /// TIME_STAMP (0x2f5)
    TimeStamp(TimeStampFrame),
    /// PATH_ABANDON (0x15228c05)
    PathAbandon(PathAbandonFrame),
    /// PATH_BACKUP (0x15228c07)
    PathBackup(PathStatusFrame),
    /// PATH_AVAILABLE (0x15228c08)
    PathAvailable(PathStatusFrame),
    /// PATHS_BLOCKED (0x15228c0d)
    PathsBlocked(PathsBlockedFrame),
    /// BDP (0xebd9)
    Bdp(BdpFrame),
}

impl Frame {
    /// The canonical type identifier for this frame; STREAM and DATAGRAM
    /// recompose their flag bits from field presence.
    pub fn frame_type(&self) -> u64 {
        match self {
            Frame::Padding => FRAME_TYPE_PADDING,
            Frame::Ping => FRAME_TYPE_PING,
            Frame::Ack(ack) => {
                if ack.ecn.is_some() {
                    FRAME_TYPE_ACK_ECN
                } else {
                    FRAME_TYPE_ACK
                }
            }
            Frame::ResetStream(_) => FRAME_TYPE_RESET_STREAM,
            Frame::StopSending(_) => FRAME_TYPE_STOP_SENDING,
            Frame::Crypto(_) => FRAME_TYPE_CRYPTO,
            Frame::NewToken(_) => FRAME_TYPE_NEW_TOKEN,
            Frame::Stream(stream) => {
                let mut ty = FRAME_TYPE_STREAM_BASE;
                if stream.fin {
                    ty |= STREAM_FRAME_BIT_FIN;
                }
                if stream.length.is_some() {
                    ty |= STREAM_FRAME_BIT_LEN;
                }
                if stream.offset > 0 {
                    ty |= STREAM_FRAME_BIT_OFF;
                }
                ty
            }
            Frame::MaxData(_) => FRAME_TYPE_MAX_DATA,
            Frame::MaxStreamData(_) => FRAME_TYPE_MAX_STREAM_DATA,
            Frame::MaxStreams(ms) => {
                if ms.bidirectional {
                    FRAME_TYPE_MAX_STREAMS_BIDI
                } else {
                    FRAME_TYPE_MAX_STREAMS_UNI
                }
            }
            Frame::DataBlocked(_) => FRAME_TYPE_DATA_BLOCKED,
            Frame::StreamDataBlocked(_) => FRAME_TYPE_STREAM_DATA_BLOCKED,
            Frame::StreamsBlocked(sb) => {
                if sb.bidirectional {
                    FRAME_TYPE_STREAMS_BLOCKED_BIDI
                } else {
                    FRAME_TYPE_STREAMS_BLOCKED_UNI
                }
            }
            Frame::NewConnectionId(_) => FRAME_TYPE_NEW_CONNECTION_ID,
            Frame::RetireConnectionId(_) => FRAME_TYPE_RETIRE_CONNECTION_ID,
            Frame::PathChallenge(_) => FRAME_TYPE_PATH_CHALLENGE,
            Frame::PathResponse(_) => FRAME_TYPE_PATH_RESPONSE,
            Frame::ConnectionClose(close) => {
                if close.application {
                    FRAME_TYPE_CONNECTION_CLOSE_APP
                } else {
                    FRAME_TYPE_CONNECTION_CLOSE_TRANSPORT
                }
            }
            Frame::HandshakeDone => FRAME_TYPE_HANDSHAKE_DONE,
            Frame::Datagram(dg) => {
                if dg.length.is_some() {
                    FRAME_TYPE_DATAGRAM_LEN
                } else {
                    FRAME_TYPE_DATAGRAM
                }
            }
            Frame::AckFrequency(_) => FRAME_TYPE_ACK_FREQUENCY,
            Frame::TimeStamp(_) => FRAME_TYPE_TIME_STAMP,
            Frame::PathAbandon(_) => FRAME_TYPE_PATH_ABANDON,
            Frame::PathBackup(_) => FRAME_TYPE_PATH_BACKUP,
            Frame::PathAvailable(_) => FRAME_TYPE_PATH_AVAILABLE,
            Frame::PathsBlocked(_) => FRAME_TYPE_PATHS_BLOCKED,
            Frame::Bdp(_) => FRAME_TYPE_BDP,
        }
    }

    /// ACK-eliciting per RFC 9000 Section 13.2 (extended by RFC 9221 for
    /// DATAGRAM, which is ACK-eliciting).
    pub fn is_ack_eliciting(&self) -> bool {
        !matches!(
            self,
            Frame::Padding | Frame::Ack(_) | Frame::ConnectionClose(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_values() {
        // RFC 9000 Section 19 type registry.
        assert_eq!(FRAME_TYPE_PADDING, 0x00);
        assert_eq!(FRAME_TYPE_ACK_ECN, 0x03);
        assert_eq!(FRAME_TYPE_STREAM_BASE, 0x08);
        assert_eq!(FRAME_TYPE_NEW_CONNECTION_ID, 0x18);
        assert_eq!(FRAME_TYPE_HANDSHAKE_DONE, 0x1e);
        assert_eq!(FRAME_TYPE_DATAGRAM, 0x30);
        assert_eq!(FRAME_TYPE_DATAGRAM_LEN, 0x31);
        assert_eq!(FRAME_TYPE_ACK_FREQUENCY, 0xaf);
        assert_eq!(FRAME_TYPE_TIME_STAMP, 0x02f5);
        assert_eq!(FRAME_TYPE_BDP, 0xebd9);
    }

    #[test]
    fn test_stream_frame_type_recomposition() {
        let frame = Frame::Stream(StreamFrame {
            stream_id: StreamId::new(0),
            offset: 100,
            length: Some(1),
            fin: true,
            data: Bytes::from_static(&[0x01]),
        });
        let ty = frame.frame_type();
        assert_eq!(ty & !0x07, FRAME_TYPE_STREAM_BASE);
        assert_ne!(ty & STREAM_FRAME_BIT_FIN, 0);
        assert_ne!(ty & STREAM_FRAME_BIT_LEN, 0);
        assert_ne!(ty & STREAM_FRAME_BIT_OFF, 0);

        let bare = Frame::Stream(StreamFrame {
            stream_id: StreamId::new(0),
            offset: 0,
            length: None,
            fin: false,
            data: Bytes::new(),
        });
        assert_eq!(bare.frame_type(), FRAME_TYPE_STREAM_BASE);
    }

    #[test]
    fn test_datagram_type_from_length_presence() {
        let bare = Frame::Datagram(DatagramFrame {
            length: None,
            data: Bytes::from_static(b"d"),
        });
        assert_eq!(bare.frame_type(), FRAME_TYPE_DATAGRAM);

        let with_len = Frame::Datagram(DatagramFrame {
            length: Some(1),
            data: Bytes::from_static(b"d"),
        });
        assert_eq!(with_len.frame_type(), FRAME_TYPE_DATAGRAM_LEN);
    }

    #[test]
    fn test_ack_eliciting_classification() {
        assert!(!Frame::Padding.is_ack_eliciting());
        assert!(Frame::Ping.is_ack_eliciting());
        assert!(!Frame::Ack(AckFrame {
            largest_acked: 0,
            ack_delay: 0,
            first_range: 0,
            ranges: TinyVec::new(),
            ecn: None,
        })
        .is_ack_eliciting());
        assert!(Frame::Datagram(DatagramFrame {
            length: None,
            data: Bytes::new(),
        })
        .is_ack_eliciting());
    }

    #[test]
    fn test_stream_implied_size() {
        let frame = StreamFrame {
            stream_id: StreamId::new(4),
            offset: 100,
            length: Some(2),
            fin: false,
            data: Bytes::from_static(&[0xde, 0xad]),
        };
        assert_eq!(frame.implied_size(), Some(102));

        let overflowing = StreamFrame {
            stream_id: StreamId::new(4),
            offset: u64::MAX,
            length: Some(1),
            fin: false,
            data: Bytes::from_static(&[0x00]),
        };
        assert_eq!(overflowing.implied_size(), None);
    }
}
