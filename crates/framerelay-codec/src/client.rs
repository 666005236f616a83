use std::io::{Read, Write};

use framerelay_frame::{FrameConfig, Relay};
use framerelay_transport::DuplexStream;

use crate::encoding::{DecodeBody, EncodeBody};
use crate::endpoint::Endpoint;
use crate::error::{Op, Result};
use crate::header::ResponseHeader;

/// Client half of the RPC codec.
///
/// Each call is `write_request`, then `read_response_header` followed by
/// exactly one `read_response_body`. Every method takes `&self`: a writer
/// thread and a reader thread may share one codec, but requests must be
/// issued one at a time and so must header/body pairs.
pub struct ClientCodec<R, W> {
    endpoint: Endpoint<R, W>,
}

impl<R: Read, W: Write> ClientCodec<R, W> {
    pub fn new(relay: Relay<R, W>) -> Self {
        Self {
            endpoint: Endpoint::new(relay),
        }
    }

    pub fn relay(&self) -> &Relay<R, W> {
        self.endpoint.relay()
    }

    /// Send `method_name` and `body` as one frame tagged with `sequence_id`.
    ///
    /// The frame's options are `[sequence_id, method_name.len()]` and its
    /// payload is the method name followed by the encoded body.
    pub fn write_request(
        &self,
        sequence_id: u64,
        method_name: &str,
        body: &dyn EncodeBody,
    ) -> Result<()> {
        self.endpoint.send(
            Op::WriteRequest,
            sequence_id,
            method_name,
            body.encoding().flag(),
            |buf| body.encode_body(buf),
        )
    }

    /// Receive the next response frame and return its header.
    ///
    /// The frame stays with the codec until
    /// [`read_response_body`](Self::read_response_body) consumes it.
    pub fn read_response_header(&self) -> Result<ResponseHeader> {
        let received = self.endpoint.read_header(Op::ReadHeader)?;
        Ok(ResponseHeader {
            sequence_id: received.sequence_id,
            method_name: received.method_name,
            error: received.error,
        })
    }

    /// Decode the body of the last response header into `out`, or discard
    /// it when `out` is `None`.
    pub fn read_response_body(&self, out: Option<&mut dyn DecodeBody>) -> Result<()> {
        self.endpoint.read_body(Op::ReadBody, out)
    }

    pub fn close(&self) -> Result<()> {
        self.endpoint.close()
    }

    pub fn is_closed(&self) -> bool {
        self.endpoint.is_closed()
    }
}

impl ClientCodec<DuplexStream, DuplexStream> {
    pub fn from_stream(stream: DuplexStream) -> framerelay_frame::Result<Self> {
        Ok(Self::new(Relay::from_stream(stream)?))
    }

    pub fn with_config(
        stream: DuplexStream,
        config: FrameConfig,
    ) -> framerelay_frame::Result<Self> {
        Ok(Self::new(Relay::with_config_stream(stream, config)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use framerelay_frame::flags::{CODEC_RAW, CODEC_STRUCT, CONTROL, ERROR};
    use framerelay_frame::{Frame, FrameError, VERSION_1};

    use super::*;
    use crate::encoding::tests::{Note, Payload};
    use crate::encoding::{AltBinary, Raw, Schema, SchemaBody, SerdeBody, Structured, Text};
    use crate::error::{ErrorKind, ProtocolError};

    type Peer = Relay<DuplexStream, DuplexStream>;

    fn connected() -> (ClientCodec<DuplexStream, DuplexStream>, Peer) {
        let (left, right) = DuplexStream::pair().unwrap();
        (
            ClientCodec::from_stream(left).unwrap(),
            Relay::from_stream(right).unwrap(),
        )
    }

    fn response(flags: u8, options: &[u32], payload: &[u8]) -> Frame {
        let mut frame = Frame::new();
        frame.set_version(VERSION_1);
        frame.add_flags(flags);
        frame.set_payload_length(payload.len() as u32);
        frame.set_payload(payload);
        frame.set_options(options).unwrap();
        frame.finalize_checksum();
        frame
    }

    fn received(peer: &Peer) -> Frame {
        let mut frame = Frame::new();
        peer.receive(&mut frame).unwrap();
        frame
    }

    #[test]
    fn request_layout() {
        let (client, peer) = connected();
        client
            .write_request(42, "Service.Method", &Raw(b"body"))
            .unwrap();

        let frame = received(&peer);
        assert_eq!(frame.version(), VERSION_1);
        assert_eq!(frame.flags(), CODEC_RAW);
        assert_eq!(frame.options(), vec![42, 14]);
        assert_eq!(&frame.payload()[..14], b"Service.Method");
        assert_eq!(&frame.payload()[14..], b"body");
    }

    #[test]
    fn default_body_uses_struct_encoding() {
        let (client, peer) = connected();
        client.write_request(1, "Svc.Ping", &()).unwrap();

        let frame = received(&peer);
        assert_eq!(frame.flags(), CODEC_STRUCT);
        assert_eq!(frame.payload(), b"Svc.Ping");
    }

    #[test]
    fn error_response_splits_method_and_text() {
        let (client, peer) = connected();
        peer.send(&response(ERROR | CODEC_RAW, &[9, 14], b"Service.Methodboom"))
            .unwrap();

        let header = client.read_response_header().unwrap();
        assert_eq!(header.sequence_id, 9);
        assert_eq!(header.method_name, "Service.Method");
        assert_eq!(header.error.as_deref(), Some("boom"));

        // The error text is not handed out again as a body.
        let mut out = b"untouched".to_vec();
        client.read_response_body(Some(&mut out)).unwrap();
        assert_eq!(out, b"untouched");
    }

    #[test]
    fn suffix_of_success_response_is_not_error_text() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[3, 4], b"Svc.payload")).unwrap();

        let header = client.read_response_header().unwrap();
        assert_eq!(header.method_name, "Svc.");
        assert_eq!(header.error, None);

        let mut out = Vec::new();
        client.read_response_body(Some(&mut out)).unwrap();
        assert_eq!(out, b"payload");
    }

    #[test]
    fn every_encoding_reaches_its_decoder() {
        let (client, peer) = connected();
        let value = Payload {
            name: "x".into(),
            values: vec![10, 20],
        };

        for body in [
            &Structured(&value) as &dyn EncodeBody,
            &Text(&value),
            &AltBinary(&value),
        ] {
            client.write_request(1, "Svc.Echo", body).unwrap();
            peer.send(&received(&peer)).unwrap();

            client.read_response_header().unwrap();
            let mut out = Payload::default();
            client
                .read_response_body(Some(&mut SerdeBody(&mut out)))
                .unwrap();
            assert_eq!(out, value);
        }

        client
            .write_request(2, "Svc.Echo", &Schema(&Note { text: "n".into() }))
            .unwrap();
        peer.send(&received(&peer)).unwrap();
        client.read_response_header().unwrap();
        let mut note = Note::default();
        client
            .read_response_body(Some(&mut SchemaBody(&mut note)))
            .unwrap();
        assert_eq!(note.text, "n");
    }

    #[test]
    fn discarding_body_returns_frame_to_pool() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[1, 3], b"Svcignored")).unwrap();

        client.read_response_header().unwrap();
        assert_eq!(client.endpoint.frames().idle(), 0);
        client.read_response_body(None).unwrap();
        assert_eq!(client.endpoint.frames().idle(), 1);

        // The next call reuses that frame instead of allocating.
        peer.send(&response(CODEC_RAW, &[2, 3], b"Svc")).unwrap();
        client.read_response_header().unwrap();
        assert_eq!(client.endpoint.frames().idle(), 0);
        client.read_response_body(None).unwrap();
        assert_eq!(client.endpoint.frames().idle(), 1);
    }

    #[test]
    fn write_request_returns_buffers_and_frames() {
        let (client, peer) = connected();
        for seq in 0..3 {
            client.write_request(seq, "Svc.Call", &Raw(b"x")).unwrap();
            received(&peer);
        }
        assert_eq!(client.endpoint.buffers().idle(), 1);
        assert_eq!(client.endpoint.frames().idle(), 1);
    }

    #[test]
    fn failed_encode_still_returns_buffer() {
        let (client, _peer) = connected();
        let too_long = Note {
            text: "x".repeat(usize::from(u16::MAX) + 1),
        };
        let err = client
            .write_request(1, "Svc.Call", &Schema(&too_long))
            .unwrap_err();
        assert_eq!(err.op(), Op::WriteRequest);
        assert!(matches!(err.kind(), ErrorKind::Encoding(_)));
        assert_eq!(client.endpoint.buffers().idle(), 1);
    }

    #[test]
    fn body_without_header_is_protocol_error() {
        let (client, _peer) = connected();
        let err = client.read_response_body(None).unwrap_err();
        assert_eq!(err.op(), Op::ReadBody);
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::NoPendingHeader)
        ));
    }

    #[test]
    fn wrong_option_count_is_protocol_error() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[100, 10_000, 100_000], b""))
            .unwrap();

        let err = client.read_response_header().unwrap_err();
        assert_eq!(err.op(), Op::ReadHeader);
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::OptionCount {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn method_length_beyond_payload_is_protocol_error() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[1, 50], b"short")).unwrap();

        let err = client.read_response_header().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::MethodLength { len: 50, payload: 5 })
        ));
    }

    #[test]
    fn unknown_encoding_is_protocol_error() {
        let (client, peer) = connected();
        peer.send(&response(CONTROL, &[1, 3], b"Svcbody")).unwrap();

        client.read_response_header().unwrap();
        let mut out = Vec::new();
        let err = client.read_response_body(Some(&mut out)).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::UnknownEncoding(CONTROL))
        ));
        assert_eq!(client.endpoint.frames().idle(), 1);
    }

    #[test]
    fn mismatched_destination_is_encoding_error() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[1, 3], b"Svcbytes")).unwrap();

        client.read_response_header().unwrap();
        let mut out = Payload::default();
        let err = client
            .read_response_body(Some(&mut SerdeBody(&mut out)))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Encoding(_)));
    }

    #[test]
    fn corrupted_response_is_checksum_error() {
        use std::io::Write as _;

        let (left, mut right) = DuplexStream::pair().unwrap();
        let client = ClientCodec::from_stream(left).unwrap();

        let mut bytes = response(CODEC_RAW, &[1, 3], b"Svc").raw_bytes().to_vec();
        // First byte of the checksum field.
        bytes[6] ^= 0x01;
        right.write_all(&bytes).unwrap();

        let err = client.read_response_header().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Checksum));
    }

    #[test]
    fn peer_hangup_is_transport_error() {
        let (client, peer) = connected();
        peer.close().unwrap();
        let err = client.read_response_header().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Transport(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn sequence_id_must_fit_option_word() {
        let (client, _peer) = connected();
        let err = client
            .write_request(u64::from(u32::MAX) + 1, "Svc.Call", &())
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::SequenceOverflow(_))
        ));
    }

    #[test]
    fn second_header_discards_unread_body() {
        let (client, peer) = connected();
        peer.send(&response(CODEC_RAW, &[1, 3], b"Svcfirst")).unwrap();
        peer.send(&response(CODEC_RAW, &[2, 3], b"Svcsecond")).unwrap();

        assert_eq!(client.read_response_header().unwrap().sequence_id, 1);
        assert_eq!(client.read_response_header().unwrap().sequence_id, 2);

        let mut out = Vec::new();
        client.read_response_body(Some(&mut out)).unwrap();
        assert_eq!(out, b"second");
    }

    #[test]
    fn close_is_idempotent() {
        let (client, peer) = connected();
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());

        let err = client.write_request(1, "Svc.Call", &()).unwrap_err();
        assert!(err.is_closed());
        assert!(client.read_response_header().unwrap_err().is_closed());
        assert!(client.read_response_body(None).unwrap_err().is_closed());

        let mut frame = Frame::new();
        assert!(matches!(
            peer.receive(&mut frame),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn shared_between_writer_and_reader_threads() {
        let (client, peer) = connected();
        let client = Arc::new(client);

        let echo = std::thread::spawn(move || {
            for _ in 0..32 {
                let frame = received(&peer);
                peer.send(&frame).unwrap();
            }
        });

        let reader = {
            let client = Arc::clone(&client);
            std::thread::spawn(move || {
                for seq in 0..32u64 {
                    let header = client.read_response_header().unwrap();
                    assert_eq!(header.sequence_id, seq);
                    let mut out = Vec::new();
                    client.read_response_body(Some(&mut out)).unwrap();
                    assert_eq!(out, format!("call-{seq}").as_bytes());
                }
            })
        };

        for seq in 0..32u64 {
            client
                .write_request(seq, "Svc.Echo", &Raw(format!("call-{seq}").as_bytes()))
                .unwrap();
        }

        reader.join().unwrap();
        echo.join().unwrap();
    }
}
