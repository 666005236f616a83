use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use framerelay_transport::DuplexStream;
use tracing::{debug, trace, warn};

use crate::error::{FrameError, Result};
use crate::frame::{parse_prefix, Frame, FrameConfig, PREFIX_SIZE};

/// Moves whole frames over a duplex byte stream.
///
/// The read half and the write half each sit behind their own lock, so one
/// thread can [`send`](Relay::send) while another blocks in
/// [`receive`](Relay::receive) on the same `&Relay`. Concurrent sends are
/// serialized by the write lock and never interleave on the wire.
///
/// Partial reads, short writes and `Interrupted` are handled internally.
/// Any other I/O failure, including a read or write timeout, aborts the
/// frame in flight; the stream is then out of sync and should be closed.
pub struct Relay<R, W> {
    reader: Mutex<Option<R>>,
    writer: Mutex<Option<W>>,
    /// Extra handle used to shut the socket down on close, so the peer sees
    /// end of stream even while other clones of the stream are alive.
    hangup: Mutex<Option<DuplexStream>>,
    config: FrameConfig,
}

impl<R: Read, W: Write> Relay<R, W> {
    /// Create a relay over separate read and write halves (pipes, child
    /// process stdio) with default configuration.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    /// Create a relay with explicit configuration.
    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            hangup: Mutex::new(None),
            config,
        }
    }

    /// Write the frame's full wire representation, then flush.
    pub fn send(&self, frame: &Frame) -> Result<()> {
        frame.validate_for_send(self.config.max_payload_size)?;

        let mut guard = lock(&self.writer);
        let writer = guard.as_mut().ok_or(FrameError::Closed)?;

        write_full(writer, frame.raw_bytes())?;
        flush(writer)?;

        trace!(
            flags = frame.flags(),
            options = frame.option_count(),
            payload = frame.payload().len(),
            "frame sent"
        );
        Ok(())
    }

    /// Read exactly one frame into `frame`.
    ///
    /// On any failure, including a checksum mismatch, `frame` is left empty.
    pub fn receive(&self, frame: &mut Frame) -> Result<()> {
        frame.reset();

        let mut guard = lock(&self.reader);
        let reader = guard.as_mut().ok_or(FrameError::Closed)?;

        let result = read_frame(reader, frame, self.config.max_payload_size);
        if result.is_err() {
            frame.reset();
        }
        result
    }

    /// Flush and release both halves of the transport. A relay built over
    /// a duplex stream also shuts the socket down in both directions.
    ///
    /// The first call surfaces the flush or shutdown error, if any. Later
    /// calls are no-ops that succeed.
    pub fn close(&self) -> Result<()> {
        let writer = lock(&self.writer).take();
        let reader = lock(&self.reader).take();
        let hangup = lock(&self.hangup).take();
        if writer.is_none() && reader.is_none() {
            return Ok(());
        }

        debug!("closing relay");
        let flushed = match writer {
            Some(mut writer) => flush(&mut writer),
            None => Ok(()),
        };
        let shut = match hangup {
            Some(stream) => stream
                .shutdown()
                .map_err(|err| FrameError::Io(err.into_io())),
            None => Ok(()),
        };
        drop(reader);
        flushed.and(shut)
    }

    /// True once [`close`](Relay::close) has run.
    pub fn is_closed(&self) -> bool {
        lock(&self.writer).is_none()
    }

    /// Current relay configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Consume the relay and return whatever halves are still open.
    pub fn into_parts(self) -> (Option<R>, Option<W>) {
        let reader = self
            .reader
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let writer = self
            .writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (reader, writer)
    }
}

impl Relay<DuplexStream, DuplexStream> {
    /// Create a relay over one duplex stream (socket), cloning the handle
    /// so reads and writes proceed independently.
    pub fn from_stream(stream: DuplexStream) -> Result<Self> {
        Self::with_config_stream(stream, FrameConfig::default())
    }

    /// Like [`from_stream`](Relay::from_stream), applying the configured
    /// read and write timeouts to the stream.
    pub fn with_config_stream(stream: DuplexStream, config: FrameConfig) -> Result<Self> {
        stream
            .set_read_timeout(config.read_timeout)
            .map_err(|err| FrameError::Io(err.into_io()))?;
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(|err| FrameError::Io(err.into_io()))?;
        let reader = stream
            .try_clone()
            .map_err(|err| FrameError::Io(err.into_io()))?;
        let hangup = stream
            .try_clone()
            .map_err(|err| FrameError::Io(err.into_io()))?;
        debug!(transport = stream.transport_name(), "relay attached");
        let relay = Self::with_config(reader, stream, config);
        *lock(&relay.hangup) = Some(hangup);
        Ok(relay)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_frame<R: Read>(reader: &mut R, frame: &mut Frame, max_payload: usize) -> Result<()> {
    let wire = frame.wire_mut();

    wire.resize(PREFIX_SIZE, 0);
    read_full(reader, &mut wire[..PREFIX_SIZE])?;
    let (payload_len, option_count) = parse_prefix(&wire[..PREFIX_SIZE], max_payload)?;

    let options_end = PREFIX_SIZE + option_count * 4;
    wire.resize(options_end, 0);
    read_full(reader, &mut wire[PREFIX_SIZE..])?;

    wire.resize(options_end + payload_len, 0);
    read_full(reader, &mut wire[options_end..])?;

    if !frame.verify_checksum() {
        warn!(
            flags = frame.flags(),
            payload = payload_len,
            "dropping frame with bad checksum"
        );
        return Err(FrameError::ChecksumMismatch);
    }

    trace!(
        flags = frame.flags(),
        options = option_count,
        payload = payload_len,
        "frame received"
    );
    Ok(())
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn write_full<W: Write>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

fn flush<W: Write>(writer: &mut W) -> Result<()> {
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
