use std::fmt;

use framerelay_frame::FrameError;

use crate::encoding::Encoding;

/// Boxed error returned by [`SchemaMessage`](crate::SchemaMessage) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The codec step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    WriteRequest,
    ReadHeader,
    ReadBody,
    WriteResponse,
    ReadRequestHeader,
    ReadRequestBody,
    Close,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WriteRequest => "write-request",
            Self::ReadHeader => "read-header",
            Self::ReadBody => "read-body",
            Self::WriteResponse => "write-response",
            Self::ReadRequestHeader => "read-request-header",
            Self::ReadRequestBody => "read-request-body",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A codec failure, tagged with the step that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{op}: {kind}")]
pub struct CodecError {
    op: Op,
    #[source]
    kind: ErrorKind,
}

impl CodecError {
    pub fn new(op: Op, kind: impl Into<ErrorKind>) -> Self {
        Self {
            op,
            kind: kind.into(),
        }
    }

    /// Classify a frame-layer failure.
    pub fn frame(op: Op, err: FrameError) -> Self {
        let kind = match err {
            FrameError::ChecksumMismatch => ErrorKind::Checksum,
            FrameError::Closed => ErrorKind::Closed,
            FrameError::Io(_) | FrameError::ConnectionClosed => ErrorKind::Transport(err),
            FrameError::UnsupportedVersion(_)
            | FrameError::PayloadTooLarge { .. }
            | FrameError::LengthMismatch { .. }
            | FrameError::TooManyOptions(_) => ErrorKind::Protocol(ProtocolError::Frame(err)),
        };
        Self { op, kind }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::Closed)
    }
}

/// What went wrong, independent of where.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A body could not be serialized or deserialized.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A received frame failed its integrity check.
    #[error("checksum error: frame failed verification")]
    Checksum,

    /// The frame was intact but its contents violate the call layout.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The underlying stream failed or ended mid-frame.
    #[error("transport error: {0}")]
    Transport(#[source] FrameError),

    /// The codec was already closed.
    #[error("codec closed")]
    Closed,
}

/// Violations of the call layout.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("expected {expected} option words, got {actual}")]
    OptionCount { expected: usize, actual: usize },

    #[error("method name length {len} exceeds payload of {payload} bytes")]
    MethodLength { len: usize, payload: usize },

    #[error("method name is not valid UTF-8: {0}")]
    MethodName(#[source] std::str::Utf8Error),

    #[error("method name of {0} bytes does not fit an option word")]
    MethodTooLong(usize),

    #[error("sequence id {0} does not fit an option word")]
    SequenceOverflow(u64),

    #[error("no recognized body encoding in flags {0:#04x}")]
    UnknownEncoding(u8),

    #[error("no header has been read for this body")]
    NoPendingHeader,

    #[error(transparent)]
    Frame(FrameError),
}

/// Body serialization failures.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("struct body: {0}")]
    Struct(#[from] bincode::Error),

    #[error("text body: {0}")]
    Text(#[from] serde_json::Error),

    #[error("alt-binary body encode: {0}")]
    AltBinaryEncode(#[from] rmp_serde::encode::Error),

    #[error("alt-binary body decode: {0}")]
    AltBinaryDecode(#[from] rmp_serde::decode::Error),

    #[error("schema body: {0}")]
    Schema(#[source] BoxError),

    /// The destination cannot hold a body of this encoding.
    #[error("cannot decode {encoding} body into {destination}")]
    Mismatch {
        encoding: Encoding,
        destination: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
