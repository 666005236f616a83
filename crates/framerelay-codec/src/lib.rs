//! RPC codecs over checksummed frames.
//!
//! A call travels as one frame: the payload is the method name followed by
//! the encoded body, and the two option words carry the sequence id and
//! the method-name length. The body encoding is named by a flag bit so the
//! receiver can pick the matching decoder.
//!
//! - [`ClientCodec`] writes requests and reads responses
//! - [`ServerCodec`] reads requests and writes responses
//! - [`encoding`] defines the body encodings and the send/receive adapters
//! - [`pool`] recycles payload buffers and frames between calls

pub mod client;
mod endpoint;
pub mod encoding;
pub mod error;
pub mod header;
pub mod pool;
pub mod server;

pub use client::ClientCodec;
pub use encoding::{
    AltBinary, DecodeBody, EncodeBody, Encoding, Raw, Schema, SchemaBody, SchemaMessage, SerdeBody,
    Structured, Text,
};
pub use error::{CodecError, EncodingError, ErrorKind, Op, ProtocolError, Result};
pub use header::{RequestHeader, ResponseHeader};
pub use pool::{Pool, Pooled, Recycle};
pub use server::ServerCodec;
