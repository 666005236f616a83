/// Errors that can occur while building, relaying or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The received frame does not match its checksum.
    #[error("frame checksum verification failed")]
    ChecksumMismatch,

    /// The frame was encoded with a layout this build does not understand.
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The header's payload length disagrees with the payload carried.
    #[error("payload length mismatch (header says {declared}, payload is {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// More option words than the 1-byte count can describe.
    #[error("too many options ({0}, max 255)")]
    TooManyOptions(usize),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The relay has already been closed.
    #[error("relay closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
