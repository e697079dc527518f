//! Frame decoding: dispatch on the leading varint type identifier, then
//! per-frame field extraction.
//!
//! The decoder is a pure grammar. It checks per-field structural rules
//! (length classes, declared lengths against remaining bytes, fixed-size
//! trailers, the NEW_CONNECTION_ID length byte) and leaves every cross-field
//! and stateful rule to [`validate`](crate::validate::validate). Decoding a
//! frame never requires a connection.
//!
//! Each attempt terminates in exactly one of two states: an accepted frame
//! with the bytes it consumed plus any advisories, or one
//! [`ErrorKind`](crate::error::ErrorKind). There is no resync after a
//! malformed frame; the caller owns packet-level recovery.

#![forbid(unsafe_code)]

use crate::config::DecoderConfig;
use crate::error::{Advisories, Advisory, ErrorKind, Result};
use crate::frames::types::*;
use crate::types::{StreamId, MAX_CID_LENGTH, STATELESS_RESET_TOKEN_LEN};
use crate::varint;
use bytes::Bytes;
use tinyvec::TinyVec;

/// Cursor over one packet payload. Tracks position, collects advisories for
/// non-canonical varints, and enforces strict mode when configured.
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    advisories: Advisories,
    strict: bool,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8], strict: bool) -> Self {
        Self {
            buf,
            pos: 0,
            advisories: Vec::new(),
            strict,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Decode the next varint field. Non-minimal encodings are legal and
    /// produce an advisory naming `field`, unless strict mode rejects them.
    fn varint(&mut self, field: &'static str) -> Result<u64> {
        let v = varint::decode(&self.buf[self.pos..])?;
        if !v.is_canonical() {
            if self.strict {
                return Err(ErrorKind::InvalidFieldValue);
            }
            self.advisories.push(Advisory::NonCanonicalVarint {
                field,
                encoded_len: v.encoded_len,
            });
        }
        self.pos += v.encoded_len;
        Ok(v.value)
    }

    /// One raw byte (used only where the grammar says byte, not varint).
    fn byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(ErrorKind::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    /// Exactly `n` raw bytes.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ErrorKind::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// A declared-length field: `Truncated` when the declaration exceeds
    /// what remains, never silent truncation.
    fn take_declared(&mut self, declared: u64) -> Result<&'a [u8]> {
        if declared > self.remaining() as u64 {
            return Err(ErrorKind::Truncated);
        }
        self.take(declared as usize)
    }

    /// Everything through the end of the packet (implicit-length fields).
    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

/// Decodes one frame at a time from a packet payload.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    config: DecoderConfig,
}

impl FrameDecoder {
    /// Decoder with default (lenient) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder with explicit configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the frame at the front of `buf`.
    ///
    /// `packet_len` is the declared packet payload length: it bounds the
    /// frame, and implicit-length fields (STREAM without the LEN bit,
    /// DATAGRAM 0x30) extend exactly through it. `packet_len > buf.len()`
    /// is itself `Truncated`.
    ///
    /// Returns the frame, the bytes consumed, and any advisories.
    pub fn decode_frame(
        &self,
        buf: &[u8],
        packet_len: usize,
    ) -> Result<(Frame, usize, Advisories)> {
        if packet_len > buf.len() {
            return Err(ErrorKind::Truncated);
        }
        let mut r = FieldReader::new(&buf[..packet_len], self.config.strict_varints);

        let ty = r.varint("type")?;
        let frame = match ty {
            FRAME_TYPE_PADDING => {
                if self.config.coalesce_padding {
                    // A run of zero bytes is one PADDING frame. Only raw
                    // zero bytes coalesce; a non-minimal encoding of type 0
                    // starts a frame of its own.
                    while r.remaining() > 0 && r.buf[r.pos] == 0x00 {
                        r.pos += 1;
                    }
                }
                Frame::Padding
            }
            FRAME_TYPE_PING => Frame::Ping,
            FRAME_TYPE_ACK => Frame::Ack(parse_ack(&mut r, false, self.config.max_ack_ranges)?),
            FRAME_TYPE_ACK_ECN => {
                Frame::Ack(parse_ack(&mut r, true, self.config.max_ack_ranges)?)
            }
            FRAME_TYPE_RESET_STREAM => Frame::ResetStream(ResetStreamFrame {
                stream_id: StreamId::new(r.varint("stream_id")?),
                error_code: r.varint("error_code")?,
                final_size: r.varint("final_size")?,
            }),
            FRAME_TYPE_STOP_SENDING => Frame::StopSending(StopSendingFrame {
                stream_id: StreamId::new(r.varint("stream_id")?),
                error_code: r.varint("error_code")?,
            }),
            FRAME_TYPE_CRYPTO => {
                let offset = r.varint("offset")?;
                let length = r.varint("length")?;
                Frame::Crypto(CryptoFrame {
                    offset,
                    data: Bytes::copy_from_slice(r.take_declared(length)?),
                })
            }
            FRAME_TYPE_NEW_TOKEN => {
                let length = r.varint("token_length")?;
                if length == 0 {
                    // RFC 9000 19.7: an empty token is a FRAME_ENCODING_ERROR.
                    return Err(ErrorKind::InvalidFieldValue);
                }
                Frame::NewToken(NewTokenFrame {
                    token: Bytes::copy_from_slice(r.take_declared(length)?),
                })
            }
            ty if (FRAME_TYPE_STREAM_BASE..=FRAME_TYPE_STREAM_BASE + 0x07).contains(&ty) => {
                Frame::Stream(parse_stream(&mut r, ty)?)
            }
            FRAME_TYPE_MAX_DATA => Frame::MaxData(MaxDataFrame {
                maximum_data: r.varint("maximum_data")?,
            }),
            FRAME_TYPE_MAX_STREAM_DATA => Frame::MaxStreamData(MaxStreamDataFrame {
                stream_id: StreamId::new(r.varint("stream_id")?),
                maximum_stream_data: r.varint("maximum_stream_data")?,
            }),
            FRAME_TYPE_MAX_STREAMS_BIDI | FRAME_TYPE_MAX_STREAMS_UNI => {
                Frame::MaxStreams(MaxStreamsFrame {
                    maximum_streams: r.varint("maximum_streams")?,
                    bidirectional: ty == FRAME_TYPE_MAX_STREAMS_BIDI,
                })
            }
            FRAME_TYPE_DATA_BLOCKED => Frame::DataBlocked(DataBlockedFrame {
                limit: r.varint("limit")?,
            }),
            FRAME_TYPE_STREAM_DATA_BLOCKED => Frame::StreamDataBlocked(StreamDataBlockedFrame {
                stream_id: StreamId::new(r.varint("stream_id")?),
                limit: r.varint("limit")?,
            }),
            FRAME_TYPE_STREAMS_BLOCKED_BIDI | FRAME_TYPE_STREAMS_BLOCKED_UNI => {
                Frame::StreamsBlocked(StreamsBlockedFrame {
                    limit: r.varint("limit")?,
                    bidirectional: ty == FRAME_TYPE_STREAMS_BLOCKED_BIDI,
                })
            }
            FRAME_TYPE_NEW_CONNECTION_ID => {
                Frame::NewConnectionId(parse_new_connection_id(&mut r)?)
            }
            FRAME_TYPE_RETIRE_CONNECTION_ID => {
                Frame::RetireConnectionId(RetireConnectionIdFrame {
                    sequence_number: r.varint("sequence_number")?,
                })
            }
            FRAME_TYPE_PATH_CHALLENGE => Frame::PathChallenge(PathChallengeFrame {
                data: take_array8(&mut r)?,
            }),
            FRAME_TYPE_PATH_RESPONSE => Frame::PathResponse(PathResponseFrame {
                data: take_array8(&mut r)?,
            }),
            FRAME_TYPE_CONNECTION_CLOSE_TRANSPORT | FRAME_TYPE_CONNECTION_CLOSE_APP => {
                let application = ty == FRAME_TYPE_CONNECTION_CLOSE_APP;
                let error_code = r.varint("error_code")?;
                let frame_type = if application {
                    None
                } else {
                    Some(r.varint("frame_type")?)
                };
                let reason_len = r.varint("reason_length")?;
                Frame::ConnectionClose(ConnectionCloseFrame {
                    error_code,
                    frame_type,
                    reason: Bytes::copy_from_slice(r.take_declared(reason_len)?),
                    application,
                })
            }
            FRAME_TYPE_HANDSHAKE_DONE => Frame::HandshakeDone,
            FRAME_TYPE_DATAGRAM => Frame::Datagram(DatagramFrame {
                length: None,
                data: Bytes::copy_from_slice(r.rest()),
            }),
            FRAME_TYPE_DATAGRAM_LEN => {
                let length = r.varint("length")?;
                Frame::Datagram(DatagramFrame {
                    length: Some(length),
                    data: Bytes::copy_from_slice(r.take_declared(length)?),
                })
            }
            FRAME_TYPE_ACK_FREQUENCY => Frame::AckFrequency(AckFrequencyFrame {
                sequence_number: r.varint("sequence_number")?,
                packet_tolerance: r.varint("packet_tolerance")?,
                update_max_ack_delay: r.varint("update_max_ack_delay")?,
                reordering_threshold: r.varint("reordering_threshold")?,
            }),
            FRAME_TYPE_TIME_STAMP => Frame::TimeStamp(TimeStampFrame {
                timestamp: r.varint("timestamp")?,
            }),
            FRAME_TYPE_PATH_ABANDON => Frame::PathAbandon(PathAbandonFrame {
                path_id: r.varint("path_id")?,
                error_code: r.varint("error_code")?,
            }),
            FRAME_TYPE_PATH_BACKUP => Frame::PathBackup(PathStatusFrame {
                path_id: r.varint("path_id")?,
                status_sequence: r.varint("status_sequence")?,
            }),
            FRAME_TYPE_PATH_AVAILABLE => Frame::PathAvailable(PathStatusFrame {
                path_id: r.varint("path_id")?,
                status_sequence: r.varint("status_sequence")?,
            }),
            FRAME_TYPE_PATHS_BLOCKED => Frame::PathsBlocked(PathsBlockedFrame {
                maximum_paths: r.varint("maximum_paths")?,
            }),
            FRAME_TYPE_BDP => {
                let lifetime = r.varint("lifetime")?;
                let bytes_in_flight = r.varint("bytes_in_flight")?;
                let min_rtt = r.varint("min_rtt")?;
                let address_len = r.varint("address_length")?;
                Frame::Bdp(BdpFrame {
                    lifetime,
                    bytes_in_flight,
                    min_rtt,
                    address: Bytes::copy_from_slice(r.take_declared(address_len)?),
                })
            }
            unknown => return Err(ErrorKind::UnknownFrameType(unknown)),
        };

        let consumed = r.pos;
        Ok((frame, consumed, r.advisories))
    }
}

fn parse_ack(r: &mut FieldReader<'_>, ecn: bool, max_ranges: usize) -> Result<AckFrame> {
    let largest_acked = r.varint("largest_acked")?;
    let ack_delay = r.varint("ack_delay")?;
    let range_count = r.varint("ack_range_count")?;
    if range_count > max_ranges as u64 {
        // A hostile count costs nothing to declare; bound it before walking.
        return Err(ErrorKind::InvalidFieldValue);
    }
    let first_range = r.varint("first_ack_range")?;

    let mut ranges: TinyVec<[AckRange; 8]> = TinyVec::new();
    for _ in 0..range_count {
        ranges.push(AckRange {
            gap: r.varint("gap")?,
            length: r.varint("ack_range_length")?,
        });
    }

    let ecn = if ecn {
        Some(EcnCounts {
            ect0: r.varint("ect0")?,
            ect1: r.varint("ect1")?,
            ce: r.varint("ce")?,
        })
    } else {
        None
    };

    Ok(AckFrame {
        largest_acked,
        ack_delay,
        first_range,
        ranges,
        ecn,
    })
}

fn parse_stream(r: &mut FieldReader<'_>, ty: u64) -> Result<StreamFrame> {
    let fin = ty & STREAM_FRAME_BIT_FIN != 0;
    let has_len = ty & STREAM_FRAME_BIT_LEN != 0;
    let has_off = ty & STREAM_FRAME_BIT_OFF != 0;

    let stream_id = StreamId::new(r.varint("stream_id")?);
    let offset = if has_off { r.varint("offset")? } else { 0 };

    let (length, data) = if has_len {
        let length = r.varint("length")?;
        (Some(length), r.take_declared(length)?)
    } else {
        // LEN bit unset: the frame extends through the end of the packet.
        (None, r.rest())
    };

    Ok(StreamFrame {
        stream_id,
        offset,
        length,
        fin,
        data: Bytes::copy_from_slice(data),
    })
}

fn parse_new_connection_id(r: &mut FieldReader<'_>) -> Result<NewConnectionIdFrame> {
    let sequence_number = r.varint("sequence_number")?;
    let retire_prior_to = r.varint("retire_prior_to")?;

    // The length is one raw byte, not a varint (RFC 9000 19.15), and must
    // name a real connection ID.
    let cid_len = r.byte()? as usize;
    if cid_len == 0 || cid_len > MAX_CID_LENGTH {
        return Err(ErrorKind::InvalidFieldValue);
    }
    let connection_id = Bytes::copy_from_slice(r.take(cid_len)?);

    let mut stateless_reset_token = [0u8; STATELESS_RESET_TOKEN_LEN];
    stateless_reset_token.copy_from_slice(r.take(STATELESS_RESET_TOKEN_LEN)?);

    Ok(NewConnectionIdFrame {
        sequence_number,
        retire_prior_to,
        connection_id,
        stateless_reset_token,
    })
}

fn take_array8(r: &mut FieldReader<'_>) -> Result<[u8; 8]> {
    let mut data = [0u8; 8];
    data.copy_from_slice(r.take(8)?);
    Ok(data)
}
