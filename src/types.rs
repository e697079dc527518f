//! Core wire types shared by the grammar and the validator.

#![forbid(unsafe_code)]

use crate::varint::VARINT_MAX;

/// Maximum connection ID length carried in NEW_CONNECTION_ID (RFC 9000 Section 19.15).
pub const MAX_CID_LENGTH: usize = 20;

/// Stateless reset token length (RFC 9000 Section 10.3).
pub const STATELESS_RESET_TOKEN_LEN: usize = 16;

/// Stream-count ceiling for MAX_STREAMS / STREAMS_BLOCKED (RFC 9000 Section 19.11).
pub const MAX_STREAM_COUNT: u64 = 1u64 << 60;

/// Maximum Stream ID value (2^62 - 1).
pub const MAX_STREAM_ID: u64 = VARINT_MAX;

/// Connection endpoint side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Client endpoint
    Client,
    /// Server endpoint
    Server,
}

impl Side {
    /// Check if this side is the client.
    pub fn is_client(self) -> bool {
        matches!(self, Side::Client)
    }

    /// Check if this side is the server.
    pub fn is_server(self) -> bool {
        matches!(self, Side::Server)
    }

    /// The opposite side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

/// Stream identifier (RFC 9000 Section 2.1).
///
/// The two least significant bits encode initiator and directionality:
/// bit 0 is the initiator (0 = client, 1 = server), bit 1 the direction
/// (0 = bidirectional, 1 = unidirectional). Both are derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl StreamId {
    /// Create a new StreamId.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Which side opened this stream.
    pub fn initiator(&self) -> Side {
        if self.0 & 0x01 == 0 {
            Side::Client
        } else {
            Side::Server
        }
    }

    /// Check if this stream is bidirectional.
    pub fn is_bidirectional(&self) -> bool {
        self.0 & 0x02 == 0
    }

    /// Check if this stream is unidirectional.
    pub fn is_unidirectional(&self) -> bool {
        self.0 & 0x02 != 0
    }

    /// Whether `side` is permitted to send stream data on this stream.
    ///
    /// Every bidirectional stream carries data both ways; a unidirectional
    /// stream carries data only from its initiator.
    pub fn can_send(&self, side: Side) -> bool {
        self.is_bidirectional() || self.initiator() == side
    }

    /// Whether `side` is permitted to receive stream data on this stream.
    pub fn can_receive(&self, side: Side) -> bool {
        self.is_bidirectional() || self.initiator() != side
    }
}

impl PartialEq<u64> for StreamId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}
