//! Calls the echo-server example.
//!
//! Run with:
//!   cargo run -p framerelay --example call --features logging -- "some text"

use framerelay::codec::{ClientCodec, Raw, SerdeBody, Text};
use framerelay::logging::init_logging_from_env;
use framerelay::transport::UnixDomainSocket;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello, framerelay".to_string());
    let sock_path = std::env::temp_dir().join("framerelay-echo.sock");
    let client = ClientCodec::from_stream(UnixDomainSocket::connect(&sock_path)?)?;

    client.write_request(1, "Echo.Upper", &Text(&text))?;
    let header = client.read_response_header()?;
    let mut upper = String::new();
    client.read_response_body(Some(&mut SerdeBody(&mut upper)))?;
    println!("#{} {} -> {upper}", header.sequence_id, header.method_name);

    client.write_request(2, "Echo.Bytes", &Raw(text.as_bytes()))?;
    let header = client.read_response_header()?;
    let mut bytes = Vec::new();
    client.read_response_body(Some(&mut bytes))?;
    println!("#{} {} -> {} bytes", header.sequence_id, header.method_name, bytes.len());

    client.write_request(3, "Echo.Missing", &())?;
    let header = client.read_response_header()?;
    client.read_response_body(None)?;
    println!(
        "#{} {} -> error: {}",
        header.sequence_id,
        header.method_name,
        header.error.unwrap_or_default()
    );

    client.close()?;
    Ok(())
}
