//! Decoder configuration and tunable parameters.
//!
//! Defaults match RFC behavior as the test corpus expects it: non-minimal
//! varint encodings are accepted (and reported as advisories), PADDING runs
//! collapse into a single frame, and ACK range counts are bounded before the
//! range list is walked.

#![forbid(unsafe_code)]

/// Configuration for [`FrameDecoder`](crate::frames::FrameDecoder) behavior.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Reject non-minimal varint encodings instead of accepting them with
    /// an advisory (default: false).
    ///
    /// RFC 9000 Section 16 permits any length class for any value within
    /// range, so the lenient default is the conformant one. Strict mode is
    /// for harnesses that want to flush out peers relying on non-canonical
    /// encodings; rejections surface as `InvalidFieldValue`.
    pub strict_varints: bool,

    /// Collapse a run of consecutive zero bytes after a PADDING type into a
    /// single PADDING frame (default: true).
    ///
    /// Disable to observe one frame per padding byte, e.g. when a harness
    /// counts frame boundaries.
    pub coalesce_padding: bool,

    /// Maximum ACK Range Count accepted before walking the range list
    /// (default: 256).
    ///
    /// A declared count only costs bytes once the ranges are actually
    /// present, but crafted inputs declare counts in the millions; counts
    /// above this limit are rejected as `InvalidFieldValue` without
    /// walking.
    pub max_ack_ranges: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            strict_varints: false,
            coalesce_padding: true,
            max_ack_ranges: 256,
        }
    }
}

impl DecoderConfig {
    /// Strict configuration: minimal encodings only.
    pub fn strict() -> Self {
        Self {
            strict_varints: true,
            ..Default::default()
        }
    }

    /// Validate configuration values are within reasonable bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_ack_ranges == 0 {
            return Err("max_ack_ranges must be non-zero".into());
        }
        Ok(())
    }
}
