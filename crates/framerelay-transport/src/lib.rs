//! Duplex byte-stream transports.
//!
//! Provides a unified handle over the reliable, ordered byte channels a
//! relay can run on:
//! - Unix domain sockets (Linux/macOS)
//! - TCP streams
//!
//! This is the lowest layer of framerelay. Frames and codecs build on the
//! [`DuplexStream`] type provided here, but any `Read + Write` pair works.

pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::DuplexStream;
pub use tcp::TcpSocket;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
