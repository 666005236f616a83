//! Checksummed binary framing and an atomic frame relay.
//!
//! Every frame on the wire carries:
//! - A 1-byte format version and a 1-byte flag mask
//! - A 4-byte little-endian payload length
//! - A 4-byte little-endian CRC32 over every other byte of the frame
//! - A 1-byte option count followed by that many 4-byte option words
//! - The payload
//!
//! [`Relay`] moves whole frames over any duplex byte stream: callers never
//! see partial reads, short writes, or a frame that failed its checksum.

pub mod checksum;
pub mod error;
pub mod flags;
pub mod frame;
pub mod relay;

#[cfg(feature = "async")]
pub mod async_codec;

pub use error::{FrameError, Result};
pub use flags::{
    CODEC_ALT_BINARY, CODEC_RAW, CODEC_SCHEMA, CODEC_STRUCT, CODEC_TEXT, CONTEXT_SEPARATOR,
    CONTROL, ERROR,
};
pub use frame::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, MAX_OPTIONS, PREFIX_SIZE,
    VERSION_1,
};
pub use relay::Relay;

#[cfg(feature = "async")]
pub use async_codec::RelayCodec;
