//! `tokio_util::codec` adapter for relaying frames over async streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::frame::{decode_frame, Frame, DEFAULT_MAX_PAYLOAD};

/// Frame codec for `Framed`, `FramedRead` and `FramedWrite`.
///
/// Decoding yields only frames whose checksum verified. Encoding enforces
/// the same send-side checks as [`Relay::send`](crate::Relay::send).
#[derive(Debug, Clone)]
pub struct RelayCodec {
    max_payload: usize,
}

impl RelayCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    #[must_use]
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for RelayCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RelayCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload)
    }
}

impl Encoder<&Frame> for RelayCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        frame.validate_for_send(self.max_payload)?;
        dst.extend_from_slice(frame.raw_bytes());
        Ok(())
    }
}

impl Encoder<Frame> for RelayCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Frame>>::encode(self, &frame, dst)
    }
}
