//! Frame grammar: type definitions and the wire-format decoder.

#![forbid(unsafe_code)]

pub mod parse;
pub mod types;

pub use parse::FrameDecoder;
pub use types::{
    AckFrame, AckFrequencyFrame, AckRange, BdpFrame, ConnectionCloseFrame, CryptoFrame,
    DataBlockedFrame, DatagramFrame, EcnCounts, Frame, MaxDataFrame, MaxStreamDataFrame,
    MaxStreamsFrame, NewConnectionIdFrame, NewTokenFrame, PathAbandonFrame, PathChallengeFrame,
    PathResponseFrame, PathStatusFrame, PathsBlockedFrame, ResetStreamFrame, StopSendingFrame,
    StreamDataBlockedFrame, StreamFrame, StreamsBlockedFrame, TimeStampFrame,
};
