//! Frame flag bits.
//!
//! The low three bits are transport-level markers. The high five bits name
//! the body encoding; a frame carrying a body sets exactly one of them.
//! Flags are OR-combined into the single header byte.

/// Control frame (connection management, not an RPC body).
pub const CONTROL: u8 = 0x01;

/// The frame reports an error; its body suffix is error text.
pub const ERROR: u8 = 0x02;

/// Separates call context from payload in multi-part exchanges.
pub const CONTEXT_SEPARATOR: u8 = 0x04;

/// Body is opaque bytes.
pub const CODEC_RAW: u8 = 0x08;

/// Body is a default structured-object encoding.
pub const CODEC_STRUCT: u8 = 0x10;

/// Body is a schema-based binary message.
pub const CODEC_SCHEMA: u8 = 0x20;

/// Body is human-readable structured text.
pub const CODEC_TEXT: u8 = 0x40;

/// Body is an alternate compact binary encoding.
pub const CODEC_ALT_BINARY: u8 = 0x80;

/// Mask of all transport-level bits.
pub const TRANSPORT_MASK: u8 = CONTROL | ERROR | CONTEXT_SEPARATOR;

/// Mask of all body-encoding bits.
pub const CODEC_MASK: u8 = CODEC_RAW | CODEC_STRUCT | CODEC_SCHEMA | CODEC_TEXT | CODEC_ALT_BINARY;

const NAMES: [(u8, &str); 8] = [
    (CONTROL, "CONTROL"),
    (ERROR, "ERROR"),
    (CONTEXT_SEPARATOR, "CONTEXT_SEPARATOR"),
    (CODEC_RAW, "CODEC_RAW"),
    (CODEC_STRUCT, "CODEC_STRUCT"),
    (CODEC_SCHEMA, "CODEC_SCHEMA"),
    (CODEC_TEXT, "CODEC_TEXT"),
    (CODEC_ALT_BINARY, "CODEC_ALT_BINARY"),
];

/// Returns true if every bit of `flag` is set in `bits`.
#[inline]
pub fn has_flag(bits: u8, flag: u8) -> bool {
    bits & flag == flag
}

/// Returns only the body-encoding bits of `bits`.
#[inline]
pub fn encoding_bits(bits: u8) -> u8 {
    bits & CODEC_MASK
}

/// Human-readable names of the bits set in `bits`, lowest bit first.
pub fn flag_names(bits: u8) -> Vec<&'static str> {
    NAMES
        .iter()
        .filter(|(flag, _)| bits & flag != 0)
        .map(|(_, name)| *name)
        .collect()
}
