//! Body encodings.
//!
//! Each [`Encoding`] pairs a flag bit with a serializer. Senders wrap a
//! body in one of the adapters below ([`Structured`], [`Text`], [`Raw`],
//! [`AltBinary`], [`Schema`]) to choose how it goes on the wire; receivers
//! pass a [`DecodeBody`] destination and the frame's flags pick the decoder.

use std::fmt;

use bytes::{BufMut, BytesMut};
use framerelay_frame::flags::{
    CODEC_ALT_BINARY, CODEC_RAW, CODEC_SCHEMA, CODEC_STRUCT, CODEC_TEXT,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BoxError, EncodingError};

/// Supported body encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Opaque bytes, copied verbatim.
    Raw,
    /// Default structured encoding (bincode).
    Struct,
    /// Schema-described binary message.
    Schema,
    /// Human-readable structured text (JSON).
    Text,
    /// Compact binary with named fields (MessagePack).
    AltBinary,
}

impl Encoding {
    /// Decoder precedence when several encoding bits are set.
    const PRECEDENCE: [Encoding; 5] = [
        Encoding::Schema,
        Encoding::Text,
        Encoding::Struct,
        Encoding::Raw,
        Encoding::AltBinary,
    ];

    /// The flag bit that marks this encoding.
    pub const fn flag(self) -> u8 {
        match self {
            Self::Raw => CODEC_RAW,
            Self::Struct => CODEC_STRUCT,
            Self::Schema => CODEC_SCHEMA,
            Self::Text => CODEC_TEXT,
            Self::AltBinary => CODEC_ALT_BINARY,
        }
    }

    /// Pick the decoder for a frame's flags, or `None` if no encoding bit is set.
    pub fn from_flags(flags: u8) -> Option<Self> {
        Self::PRECEDENCE
            .into_iter()
            .find(|encoding| flags & encoding.flag() != 0)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Struct => "struct",
            Self::Schema => "schema",
            Self::Text => "text",
            Self::AltBinary => "alt-binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A message type with its own binary schema (protobuf-style).
///
/// Implement this for generated message types to send them with
/// [`Schema`] and receive them with [`SchemaBody`].
pub trait SchemaMessage {
    /// Append the encoded message to `dst`.
    fn encode_message(&self, dst: &mut BytesMut) -> Result<(), BoxError>;

    /// Merge an encoded message into `self`.
    fn merge_from(&mut self, src: &[u8]) -> Result<(), BoxError>;
}

/// A body that knows how to put itself on the wire.
pub trait EncodeBody {
    fn encoding(&self) -> Encoding;

    /// Append the encoded body to `dst`.
    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError>;
}

/// A destination a received body can be decoded into.
pub trait DecodeBody {
    fn decode_body(&mut self, encoding: Encoding, src: &[u8]) -> Result<(), EncodingError>;
}

/// Send opaque bytes.
#[derive(Debug, Clone, Copy)]
pub struct Raw<'a>(pub &'a [u8]);

/// Send a serde value with the default structured encoding.
#[derive(Debug, Clone, Copy)]
pub struct Structured<'a, T: ?Sized>(pub &'a T);

/// Send a serde value as JSON text.
#[derive(Debug, Clone, Copy)]
pub struct Text<'a, T: ?Sized>(pub &'a T);

/// Send a serde value as MessagePack with named fields.
#[derive(Debug, Clone, Copy)]
pub struct AltBinary<'a, T: ?Sized>(pub &'a T);

/// Send a [`SchemaMessage`].
#[derive(Debug, Clone, Copy)]
pub struct Schema<'a, M: ?Sized>(pub &'a M);

impl EncodeBody for Raw<'_> {
    fn encoding(&self) -> Encoding {
        Encoding::Raw
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError> {
        dst.extend_from_slice(self.0);
        Ok(())
    }
}

impl<T: Serialize + ?Sized> EncodeBody for Structured<'_, T> {
    fn encoding(&self) -> Encoding {
        Encoding::Struct
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError> {
        bincode::serialize_into(BufMut::writer(dst), self.0)?;
        Ok(())
    }
}

impl<T: Serialize + ?Sized> EncodeBody for Text<'_, T> {
    fn encoding(&self) -> Encoding {
        Encoding::Text
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError> {
        serde_json::to_writer(BufMut::writer(dst), self.0)?;
        Ok(())
    }
}

impl<T: Serialize + ?Sized> EncodeBody for AltBinary<'_, T> {
    fn encoding(&self) -> Encoding {
        Encoding::AltBinary
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError> {
        let mut writer = BufMut::writer(dst);
        rmp_serde::encode::write_named(&mut writer, self.0)?;
        Ok(())
    }
}

impl<M: SchemaMessage + ?Sized> EncodeBody for Schema<'_, M> {
    fn encoding(&self) -> Encoding {
        Encoding::Schema
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<(), EncodingError> {
        self.0.encode_message(dst).map_err(EncodingError::Schema)
    }
}

/// An empty body.
impl EncodeBody for () {
    fn encoding(&self) -> Encoding {
        Encoding::Struct
    }

    fn encode_body(&self, _dst: &mut BytesMut) -> Result<(), EncodingError> {
        Ok(())
    }
}

impl DecodeBody for Vec<u8> {
    fn decode_body(&mut self, encoding: Encoding, src: &[u8]) -> Result<(), EncodingError> {
        match encoding {
            Encoding::Raw => {
                self.clear();
                self.extend_from_slice(src);
                Ok(())
            }
            other => Err(mismatch(other, "Vec<u8>")),
        }
    }
}

impl DecodeBody for BytesMut {
    fn decode_body(&mut self, encoding: Encoding, src: &[u8]) -> Result<(), EncodingError> {
        match encoding {
            Encoding::Raw => {
                self.clear();
                self.extend_from_slice(src);
                Ok(())
            }
            other => Err(mismatch(other, "BytesMut")),
        }
    }
}

/// Decode a struct, text or alt-binary body into a serde value.
#[derive(Debug)]
pub struct SerdeBody<'a, T>(pub &'a mut T);

impl<T: DeserializeOwned> DecodeBody for SerdeBody<'_, T> {
    fn decode_body(&mut self, encoding: Encoding, src: &[u8]) -> Result<(), EncodingError> {
        *self.0 = match encoding {
            Encoding::Struct => bincode::deserialize(src)?,
            Encoding::Text => serde_json::from_slice(src)?,
            Encoding::AltBinary => rmp_serde::from_slice(src)?,
            other => return Err(mismatch(other, "serde value")),
        };
        Ok(())
    }
}

/// Decode a schema body into a [`SchemaMessage`].
#[derive(Debug)]
pub struct SchemaBody<'a, M>(pub &'a mut M);

impl<M: SchemaMessage> DecodeBody for SchemaBody<'_, M> {
    fn decode_body(&mut self, encoding: Encoding, src: &[u8]) -> Result<(), EncodingError> {
        match encoding {
            Encoding::Schema => self.0.merge_from(src).map_err(EncodingError::Schema),
            other => Err(mismatch(other, "schema message")),
        }
    }
}

fn mismatch(encoding: Encoding, destination: &'static str) -> EncodingError {
    EncodingError::Mismatch {
        encoding,
        destination,
    }
}
