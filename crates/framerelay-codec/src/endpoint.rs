//! Machinery shared by the client and server codecs.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use framerelay_frame::flags::{has_flag, ERROR};
use framerelay_frame::{Frame, FrameError, Relay, VERSION_1};
use tracing::{debug, trace, warn};

use crate::encoding::{DecodeBody, Encoding};
use crate::error::{CodecError, EncodingError, ErrorKind, Op, ProtocolError, Result};
use crate::pool::Pool;

/// Option words on every call frame: sequence id, method-name length.
const CALL_OPTIONS: usize = 2;

/// A received frame held between the header read and the body read.
struct Pending {
    frame: Frame,
    body_at: usize,
}

/// Header fields parsed out of a received call frame.
pub(crate) struct Received {
    pub sequence_id: u64,
    pub method_name: String,
    pub error: Option<String>,
}

pub(crate) struct Endpoint<R, W> {
    relay: Relay<R, W>,
    buffers: Pool<BytesMut>,
    frames: Pool<Frame>,
    pending: Mutex<Option<Pending>>,
    closed: AtomicBool,
}

impl<R: Read, W: Write> Endpoint<R, W> {
    pub fn new(relay: Relay<R, W>) -> Self {
        Self {
            relay,
            buffers: Pool::new(),
            frames: Pool::new(),
            pending: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn relay(&self) -> &Relay<R, W> {
        &self.relay
    }

    #[cfg(test)]
    pub fn buffers(&self) -> &Pool<BytesMut> {
        &self.buffers
    }

    #[cfg(test)]
    pub fn frames(&self) -> &Pool<Frame> {
        &self.frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Build and send one call frame. `body` appends the encoded body after
    /// the method name.
    pub fn send(
        &self,
        op: Op,
        sequence_id: u64,
        method_name: &str,
        flags: u8,
        body: impl FnOnce(&mut BytesMut) -> std::result::Result<(), EncodingError>,
    ) -> Result<()> {
        self.ensure_open(op)?;

        let sequence = u32::try_from(sequence_id)
            .map_err(|_| CodecError::new(op, ProtocolError::SequenceOverflow(sequence_id)))?;
        let method_len = u32::try_from(method_name.len())
            .map_err(|_| CodecError::new(op, ProtocolError::MethodTooLong(method_name.len())))?;

        let mut buf = self.buffers.acquire();
        buf.extend_from_slice(method_name.as_bytes());
        body(&mut *buf).map_err(|err| CodecError::new(op, err))?;

        let payload_len = u32::try_from(buf.len()).map_err(|_| {
            CodecError::frame(
                op,
                FrameError::PayloadTooLarge {
                    size: buf.len(),
                    max: u32::MAX as usize,
                },
            )
        })?;

        let mut frame = self.frames.acquire();
        frame.set_version(VERSION_1);
        frame.add_flags(flags);
        frame.set_payload_length(payload_len);
        frame.set_payload(&buf[..]);
        frame
            .set_options(&[sequence, method_len])
            .map_err(|err| CodecError::frame(op, err))?;
        frame.finalize_checksum();

        self.relay
            .send(&frame)
            .map_err(|err| CodecError::frame(op, err))?;

        trace!(
            %op,
            sequence_id,
            method = method_name,
            flags = frame.flags(),
            payload = buf.len(),
            "call frame sent"
        );
        Ok(())
    }

    /// Receive one call frame and keep it for [`read_body`](Self::read_body).
    pub fn read_header(&self, op: Op) -> Result<Received> {
        self.ensure_open(op)?;

        if let Some(stale) = self.take_pending() {
            warn!(%op, "discarding unread body of previous frame");
            self.frames.release(stale.frame);
        }

        let mut frame = self.frames.acquire();
        self.relay
            .receive(&mut frame)
            .map_err(|err| CodecError::frame(op, err))?;

        let (received, body_at) = parse_call(&frame).map_err(|err| CodecError::new(op, err))?;
        trace!(
            %op,
            sequence_id = received.sequence_id,
            method = %received.method_name,
            flags = frame.flags(),
            "call frame received"
        );

        *self.lock_pending() = Some(Pending {
            frame: frame.detach(),
            body_at,
        });
        Ok(received)
    }

    /// Decode the body of the frame kept by the last header read, then
    /// return that frame to the pool. `None` discards the body.
    pub fn read_body(&self, op: Op, out: Option<&mut dyn DecodeBody>) -> Result<()> {
        self.ensure_open(op)?;

        let pending = self
            .take_pending()
            .ok_or_else(|| CodecError::new(op, ProtocolError::NoPendingHeader))?;
        let frame = self.frames.adopt(pending.frame);

        let Some(out) = out else {
            return Ok(());
        };

        let flags = frame.flags();
        // An error frame's suffix is the error text, already surfaced.
        if has_flag(flags, ERROR) {
            return Ok(());
        }

        let encoding = Encoding::from_flags(flags)
            .ok_or_else(|| CodecError::new(op, ProtocolError::UnknownEncoding(flags)))?;
        out.decode_body(encoding, &frame.payload()[pending.body_at..])
            .map_err(|err| CodecError::new(op, err))
    }

    /// Close the relay once; later calls succeed without doing anything.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(pending) = self.take_pending() {
            self.frames.release(pending.frame);
        }
        debug!("closing codec");
        self.relay
            .close()
            .map_err(|err| CodecError::frame(Op::Close, err))
    }

    fn ensure_open(&self, op: Op) -> Result<()> {
        if self.is_closed() {
            return Err(CodecError::new(op, ErrorKind::Closed));
        }
        Ok(())
    }

    fn take_pending(&self) -> Option<Pending> {
        self.lock_pending().take()
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Split a call frame into its header fields and the body offset.
fn parse_call(frame: &Frame) -> std::result::Result<(Received, usize), ProtocolError> {
    if frame.option_count() != CALL_OPTIONS {
        return Err(ProtocolError::OptionCount {
            expected: CALL_OPTIONS,
            actual: frame.option_count(),
        });
    }
    let sequence_id = u64::from(frame.option(0).unwrap_or_default());
    let method_len = frame.option(1).unwrap_or_default() as usize;

    let payload = frame.payload();
    if method_len > payload.len() {
        return Err(ProtocolError::MethodLength {
            len: method_len,
            payload: payload.len(),
        });
    }
    let (method, rest) = payload.split_at(method_len);
    let method_name = std::str::from_utf8(method)
        .map_err(ProtocolError::MethodName)?
        .to_owned();

    let error = has_flag(frame.flags(), ERROR).then(|| String::from_utf8_lossy(rest).into_owned());

    Ok((
        Received {
            sequence_id,
            method_name,
            error,
        },
        method_len,
    ))
}
