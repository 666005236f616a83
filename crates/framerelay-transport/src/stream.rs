use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::error::Result;

/// A connected duplex byte stream implementing `Read + Write`.
///
/// This is the I/O type returned by the listeners in this crate. It wraps
/// either a Unix domain socket stream or a TCP stream; relays above it do
/// not care which.
pub struct DuplexStream {
    inner: DuplexStreamInner,
}

enum DuplexStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for DuplexStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => stream.read(buf),
            DuplexStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for DuplexStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => stream.write(buf),
            DuplexStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => stream.flush(),
            DuplexStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for DuplexStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: DuplexStreamInner::Unix(stream),
        }
    }
}

impl From<TcpStream> for DuplexStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: DuplexStreamInner::Tcp(stream),
        }
    }
}

impl DuplexStream {
    /// Create a connected pair of Unix streams (handy for in-process peers).
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((left.into(), right.into()))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            DuplexStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
            DuplexStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    ///
    /// Both handles refer to the same connection, so one can read while the
    /// other writes.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => Ok(stream.try_clone()?.into()),
            DuplexStreamInner::Tcp(stream) => Ok(stream.try_clone()?.into()),
        }
    }

    /// Shut down both directions of the connection.
    ///
    /// A stream the peer already tore down reports success.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
            DuplexStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            DuplexStreamInner::Unix(_) => "unix-domain-socket",
            DuplexStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for DuplexStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
