//! Checksummed frame relay and RPC codecs over pipes and sockets.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte streams over Unix domain sockets and TCP
//! - [`frame`]: the frame envelope, its CRC32 and the frame relay
//! - [`codec`]: client and server RPC codecs with pluggable body encodings
//! - [`logging`]: tracing subscriber setup (behind the `logging` feature)

/// Re-export transport types.
pub mod transport {
    pub use framerelay_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use framerelay_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use framerelay_codec::*;
}

#[cfg(feature = "logging")]
pub mod logging;
