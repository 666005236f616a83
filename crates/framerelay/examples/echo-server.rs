//! Minimal RPC echo server: accepts one client and answers every call.
//!
//! Run with:
//!   cargo run -p framerelay --example echo-server --features logging
//!
//! In another terminal:
//!   cargo run -p framerelay --example call --features logging
//!
//! `Echo.Upper` replies with the upper-cased text body, `Echo.Bytes`
//! returns raw bodies unchanged, anything else gets an error reply.

use framerelay::codec::{Raw, ResponseHeader, SerdeBody, ServerCodec, Text};
use framerelay::logging::init_logging_from_env;
use framerelay::transport::UnixDomainSocket;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let sock_path = std::env::temp_dir().join("framerelay-echo.sock");
    let listener = UnixDomainSocket::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let server = ServerCodec::from_stream(listener.accept()?)?;
    eprintln!("Client connected");

    loop {
        let request = match server.read_request_header() {
            Ok(request) => request,
            Err(e) => {
                eprintln!("Client disconnected: {e}");
                break;
            }
        };

        match request.method_name.as_str() {
            "Echo.Upper" => {
                let mut text = String::new();
                server.read_request_body(Some(&mut SerdeBody(&mut text)))?;
                let reply = text.to_uppercase();
                server.write_response(&ResponseHeader::reply_to(&request), &Text(&reply))?;
            }
            "Echo.Bytes" => {
                let mut bytes = Vec::new();
                server.read_request_body(Some(&mut bytes))?;
                server.write_response(&ResponseHeader::reply_to(&request), &Raw(&bytes))?;
            }
            other => {
                server.read_request_body(None)?;
                let header = ResponseHeader::error_to(&request, format!("unknown method {other}"));
                server.write_response(&header, &())?;
            }
        }
    }

    server.close()?;
    Ok(())
}
