use std::fmt;
use std::ops::Range;

use bytes::{BufMut, BytesMut};

use crate::checksum::Crc32;
use crate::error::{FrameError, Result};
use crate::flags::flag_names;

/// The only frame layout this crate speaks.
pub const VERSION_1: u8 = 1;

/// Fixed prefix: version (1) + flags (1) + payload length (4) + checksum (4)
/// + option count (1) = 11 bytes.
pub const PREFIX_SIZE: usize = 11;

/// Largest option count the 1-byte count field can carry.
pub const MAX_OPTIONS: usize = u8::MAX as usize;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

const VERSION_AT: usize = 0;
const FLAGS_AT: usize = 1;
const LENGTH_AT: Range<usize> = 2..6;
const CHECKSUM_AT: Range<usize> = 6..10;
const OPTION_COUNT_AT: usize = 10;
const OPTION_SIZE: usize = 4;

/// A binary frame, stored as its own wire representation.
///
/// Wire format (multi-byte integers little-endian):
/// ```text
/// ┌─────────┬───────┬─────────────┬──────────┬───────────┬──────────────┬─────────┐
/// │ Version │ Flags │ Payload len │ CRC32    │ Opt count │ Options      │ Payload │
/// │ (1B)    │ (1B)  │ (4B)        │ (4B)     │ (1B)      │ (count × 4B) │         │
/// └─────────┴───────┴─────────────┴──────────┴───────────┴──────────────┴─────────┘
/// ```
///
/// The checksum covers every byte except its own four. It is only written
/// by [`Frame::finalize_checksum`]; any later mutation leaves a stale value
/// behind that [`Frame::verify_checksum`] will reject. A new or reset frame
/// has no bytes at all and never verifies.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Frame {
    wire: BytesMut,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the format version.
    pub fn set_version(&mut self, version: u8) {
        self.prefix_mut()[VERSION_AT] = version;
    }

    /// OR `flags` into the flag byte.
    pub fn add_flags(&mut self, flags: u8) {
        self.prefix_mut()[FLAGS_AT] |= flags;
    }

    /// Set the declared payload length.
    pub fn set_payload_length(&mut self, len: u32) {
        self.prefix_mut()[LENGTH_AT].copy_from_slice(&len.to_le_bytes());
    }

    /// Replace the payload bytes. The declared length is left alone.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.prefix_mut();
        let start = self.options_end();
        self.wire.truncate(start);
        self.wire.extend_from_slice(payload);
    }

    /// Replace the option words.
    pub fn set_options(&mut self, options: &[u32]) -> Result<()> {
        if options.len() > MAX_OPTIONS {
            return Err(FrameError::TooManyOptions(options.len()));
        }
        self.prefix_mut();

        let at = self.options_end().min(self.wire.len());
        let payload = self.wire.split_off(at);
        self.wire.truncate(PREFIX_SIZE);
        self.wire[OPTION_COUNT_AT] = options.len() as u8;
        self.wire.reserve(options.len() * OPTION_SIZE + payload.len());
        for &word in options {
            self.wire.put_u32_le(word);
        }
        self.wire.unsplit(payload);
        Ok(())
    }

    /// Compute the checksum over the current bytes and store it.
    pub fn finalize_checksum(&mut self) {
        self.prefix_mut();
        let crc = self.compute_checksum();
        self.wire[CHECKSUM_AT].copy_from_slice(&crc.to_le_bytes());
    }

    /// Recompute the checksum and compare it with the stored one.
    ///
    /// Also false when the frame is empty, truncated, or its declared
    /// payload length disagrees with the payload it holds.
    pub fn verify_checksum(&self) -> bool {
        if self.wire.len() < PREFIX_SIZE || self.wire.len() < self.options_end() {
            return false;
        }
        if self.payload_length() as usize != self.payload().len() {
            return false;
        }
        self.checksum() == self.compute_checksum()
    }

    pub fn version(&self) -> u8 {
        self.wire.get(VERSION_AT).copied().unwrap_or(0)
    }

    pub fn flags(&self) -> u8 {
        self.wire.get(FLAGS_AT).copied().unwrap_or(0)
    }

    pub fn payload_length(&self) -> u32 {
        self.read_u32(LENGTH_AT)
    }

    /// The stored checksum (not recomputed).
    pub fn checksum(&self) -> u32 {
        self.read_u32(CHECKSUM_AT)
    }

    /// Number of option words the header announces.
    pub fn option_count(&self) -> usize {
        self.wire.get(OPTION_COUNT_AT).copied().unwrap_or(0) as usize
    }

    /// The option words, in order.
    pub fn options(&self) -> Vec<u32> {
        self.options_region()
            .chunks_exact(OPTION_SIZE)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect()
    }

    /// A single option word by position.
    pub fn option(&self, index: usize) -> Option<u32> {
        self.options_region()
            .chunks_exact(OPTION_SIZE)
            .nth(index)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
    }

    pub fn payload(&self) -> &[u8] {
        if self.wire.len() < PREFIX_SIZE {
            return &[];
        }
        let start = self.options_end().min(self.wire.len());
        &self.wire[start..]
    }

    /// The full wire representation: prefix, options, payload.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.wire
    }

    /// Total bytes this frame occupies on the wire.
    pub fn wire_size(&self) -> usize {
        self.wire.len()
    }

    /// True for a new or reset frame.
    pub fn is_empty(&self) -> bool {
        self.wire.is_empty()
    }

    /// Clear every field, keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.wire.clear();
    }

    /// Direct access to the wire buffer for the receive path.
    pub(crate) fn wire_mut(&mut self) -> &mut BytesMut {
        &mut self.wire
    }

    /// Check the frame is fit to put on the wire.
    pub(crate) fn validate_for_send(&self, max_payload: usize) -> Result<()> {
        if self.version() != VERSION_1 {
            return Err(FrameError::UnsupportedVersion(self.version()));
        }
        let declared = self.payload_length() as usize;
        let actual = self.payload().len();
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }
        if actual > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: actual,
                max: max_payload,
            });
        }
        Ok(())
    }

    fn prefix_mut(&mut self) -> &mut [u8] {
        if self.wire.len() < PREFIX_SIZE {
            self.wire.resize(PREFIX_SIZE, 0);
        }
        &mut self.wire[..PREFIX_SIZE]
    }

    fn options_end(&self) -> usize {
        PREFIX_SIZE + self.option_count() * OPTION_SIZE
    }

    fn options_region(&self) -> &[u8] {
        if self.wire.len() < PREFIX_SIZE {
            return &[];
        }
        let end = self.options_end().min(self.wire.len());
        &self.wire[PREFIX_SIZE..end]
    }

    fn read_u32(&self, at: Range<usize>) -> u32 {
        self.wire
            .get(at)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .unwrap_or(0)
    }

    fn compute_checksum(&self) -> u32 {
        let mut crc = Crc32::new();
        crc.update(&self.wire[..CHECKSUM_AT.start]);
        crc.update(&self.wire[CHECKSUM_AT.end..]);
        crc.finish()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("version", &self.version())
            .field("flags", &flag_names(self.flags()))
            .field("payload_length", &self.payload_length())
            .field("checksum", &format_args!("{:#010x}", self.checksum()))
            .field("options", &self.options())
            .field("payload", &format_args!("<{} bytes>", self.payload().len()))
            .finish()
    }
}

/// Append a frame's wire bytes to `dst`.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    frame.validate_for_send(u32::MAX as usize)?;
    dst.extend_from_slice(frame.raw_bytes());
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A complete frame
/// that fails its checksum is consumed and reported as
/// [`FrameError::ChecksumMismatch`].
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < PREFIX_SIZE {
        return Ok(None);
    }

    let (payload_len, option_count) = parse_prefix(&src[..PREFIX_SIZE], max_payload)?;
    let total = PREFIX_SIZE + option_count * OPTION_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    let frame = Frame {
        wire: src.split_to(total),
    };
    if !frame.verify_checksum() {
        return Err(FrameError::ChecksumMismatch);
    }
    Ok(Some(frame))
}

/// Validate a raw prefix and return `(payload_len, option_count)`.
pub(crate) fn parse_prefix(prefix: &[u8], max_payload: usize) -> Result<(usize, usize)> {
    let version = prefix[VERSION_AT];
    if version != VERSION_1 {
        return Err(FrameError::UnsupportedVersion(version));
    }

    let len = &prefix[LENGTH_AT];
    let payload_len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    Ok((payload_len, prefix[OPTION_COUNT_AT] as usize))
}

/// Configuration for frame relays.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
