use std::io::{Read, Write};

use framerelay_frame::flags::{CODEC_RAW, ERROR};
use framerelay_frame::{FrameConfig, Relay};
use framerelay_transport::DuplexStream;

use crate::encoding::{DecodeBody, EncodeBody};
use crate::endpoint::Endpoint;
use crate::error::{Op, Result};
use crate::header::{RequestHeader, ResponseHeader};

/// Server half of the RPC codec, the peer of [`ClientCodec`](crate::ClientCodec).
pub struct ServerCodec<R, W> {
    endpoint: Endpoint<R, W>,
}

impl<R: Read, W: Write> ServerCodec<R, W> {
    pub fn new(relay: Relay<R, W>) -> Self {
        Self {
            endpoint: Endpoint::new(relay),
        }
    }

    pub fn relay(&self) -> &Relay<R, W> {
        self.endpoint.relay()
    }

    /// Receive the next request frame and return its header.
    pub fn read_request_header(&self) -> Result<RequestHeader> {
        let received = self.endpoint.read_header(Op::ReadRequestHeader)?;
        Ok(RequestHeader {
            sequence_id: received.sequence_id,
            method_name: received.method_name,
        })
    }

    /// Decode the body of the last request header into `out`, or discard
    /// it when `out` is `None`.
    pub fn read_request_body(&self, out: Option<&mut dyn DecodeBody>) -> Result<()> {
        self.endpoint.read_body(Op::ReadRequestBody, out)
    }

    /// Send a reply.
    ///
    /// When `header.error` is set the body is ignored: the frame carries
    /// `ERROR | CODEC_RAW` and its payload is the method name followed by
    /// the error text.
    pub fn write_response(&self, header: &ResponseHeader, body: &dyn EncodeBody) -> Result<()> {
        match &header.error {
            Some(error) => self.endpoint.send(
                Op::WriteResponse,
                header.sequence_id,
                &header.method_name,
                ERROR | CODEC_RAW,
                |buf| {
                    buf.extend_from_slice(error.as_bytes());
                    Ok(())
                },
            ),
            None => self.endpoint.send(
                Op::WriteResponse,
                header.sequence_id,
                &header.method_name,
                body.encoding().flag(),
                |buf| body.encode_body(buf),
            ),
        }
    }

    pub fn close(&self) -> Result<()> {
        self.endpoint.close()
    }

    pub fn is_closed(&self) -> bool {
        self.endpoint.is_closed()
    }
}

impl ServerCodec<DuplexStream, DuplexStream> {
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
    use framerelay_frame::flags::{CODEC_TEXT, CONTEXT_SEPARATOR};
    use framerelay_frame::Frame;

    use super::*;
    use crate::client::ClientCodec;
    use crate::encoding::tests::Payload;
    use crate::encoding::{Raw, SerdeBody, Text};
    use crate::error::{ErrorKind, ProtocolError};

    type Client = ClientCodec<DuplexStream, DuplexStream>;
    type Server = ServerCodec<DuplexStream, DuplexStream>;

    fn connected() -> (Client, Server) {
        let (left, right) = DuplexStream::pair().unwrap();
        (
            ClientCodec::from_stream(left).unwrap(),
            ServerCodec::from_stream(right).unwrap(),
        )
    }

    #[test]
    fn request_and_reply() {
        let (client, server) = connected();
        let value = Payload {
            name: "req".into(),
            values: vec![1],
        };
        client.write_request(7, "Math.Sum", &Text(&value)).unwrap();

        let request = server.read_request_header().unwrap();
        assert_eq!(
            request,
            RequestHeader {
                sequence_id: 7,
                method_name: "Math.Sum".into()
            }
        );
        let mut got = Payload::default();
        server
            .read_request_body(Some(&mut SerdeBody(&mut got)))
            .unwrap();
        assert_eq!(got, value);

        server
            .write_response(&ResponseHeader::reply_to(&request), &Text(&42u32))
            .unwrap();

        let reply = client.read_response_header().unwrap();
        assert_eq!(reply.sequence_id, 7);
        assert_eq!(reply.method_name, "Math.Sum");
        assert!(!reply.is_error());
        let mut sum = 0u32;
        client
            .read_response_body(Some(&mut SerdeBody(&mut sum)))
            .unwrap();
        assert_eq!(sum, 42);
    }

    #[test]
    fn error_reply_layout() {
        let (left, right) = DuplexStream::pair().unwrap();
        let server = ServerCodec::from_stream(right).unwrap();
        let peer = Relay::from_stream(left).unwrap();

        let request = RequestHeader {
            sequence_id: 5,
            method_name: "Service.Method".into(),
        };
        server
            .write_response(&ResponseHeader::error_to(&request, "boom"), &Raw(b"ignored"))
            .unwrap();

        let mut frame = Frame::new();
        peer.receive(&mut frame).unwrap();
        assert_eq!(frame.flags(), ERROR | CODEC_RAW);
        assert_eq!(frame.options(), vec![5, 14]);
        assert_eq!(frame.payload(), b"Service.Methodboom");
    }

    #[test]
    fn error_reply_reaches_client() {
        let (client, server) = connected();
        client.write_request(3, "Svc.Fail", &()).unwrap();
        let request = server.read_request_header().unwrap();
        server.read_request_body(None).unwrap();

        server
            .write_response(&ResponseHeader::error_to(&request, "no such record"), &())
            .unwrap();

        let reply = client.read_response_header().unwrap();
        assert_eq!(reply.error.as_deref(), Some("no such record"));
        client.read_response_body(None).unwrap();
    }

    #[test]
    fn request_with_extra_options_is_rejected() {
        let (left, right) = DuplexStream::pair().unwrap();
        let server = ServerCodec::from_stream(right).unwrap();
        let peer = Relay::from_stream(left).unwrap();

        let mut frame = Frame::new();
        frame.set_version(framerelay_frame::VERSION_1);
        frame.add_flags(CONTEXT_SEPARATOR | CODEC_TEXT);
        frame.set_payload_length(0);
        frame.set_options(&[1]).unwrap();
        frame.finalize_checksum();
        peer.send(&frame).unwrap();

        let err = server.read_request_header().unwrap_err();
        assert_eq!(err.op(), Op::ReadRequestHeader);
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::OptionCount { actual: 1, .. })
        ));
    }

    #[test]
    fn non_utf8_method_is_rejected() {
        let (left, right) = DuplexStream::pair().unwrap();
        let server = ServerCodec::from_stream(right).unwrap();
        let peer = Relay::from_stream(left).unwrap();

        let mut frame = Frame::new();
        frame.set_version(framerelay_frame::VERSION_1);
        frame.add_flags(CODEC_RAW);
        frame.set_payload_length(2);
        frame.set_payload(&[0xFF, 0xFE]);
        frame.set_options(&[1, 2]).unwrap();
        frame.finalize_checksum();
        peer.send(&frame).unwrap();

        let err = server.read_request_header().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Protocol(ProtocolError::MethodName(_))
        ));
    }

    #[test]
    fn close_then_write_is_closed_error() {
        let (_client, server) = connected();
        server.close().unwrap();
        server.close().unwrap();
        let err = server
            .write_response(&ResponseHeader::default(), &())
            .unwrap_err();
        assert_eq!(err.op(), Op::WriteResponse);
        assert!(err.is_closed());
    }
}
