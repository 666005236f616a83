use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::DuplexStream;

/// TCP listener handing out [`DuplexStream`]s.
///
/// Accepted and connected streams have `TCP_NODELAY` set: frames are
/// written in one piece and should not wait on Nagle.
pub struct TcpSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocket {
    /// Bind and listen on `addr`. Use port 0 for an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let endpoint = format!("{addr:?}");
        let bind_err = |source| TransportError::Bind {
            endpoint: endpoint.clone(),
            source,
        };
        let listener = TcpListener::bind(&addr).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        info!(%local_addr, "listening on tcp");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<DuplexStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted tcp connection");
        Ok(stream.into())
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<DuplexStream> {
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            endpoint: format!("{addr:?}"),
            source,
        })?;
        stream.set_nodelay(true)?;
        debug!(?addr, "connected over tcp");
        Ok(stream.into())
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
