//! Table-driven CRC32 (IEEE 802.3, reflected polynomial `0xEDB88320`).
//!
//! The 256-entry lookup table is computed at compile time, so it exists
//! before any frame is finalized or verified and is never mutated.

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Precomputed byte-wise remainders.
pub static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC32 state, for checksums over non-contiguous regions.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub const fn new() -> Self {
        Self { state: !0 }
    }

    /// Feed more bytes.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.state;
        for &byte in data {
            crc = TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
        }
        self.state = crc;
    }

    /// The checksum of everything fed so far.
    #[inline]
    pub fn finish(&self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC32 of a single contiguous slice.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_check_value() {
        // Standard CRC-32 check value for the ASCII digits 1-9.
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn table_endpoints() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], 0x7707_3096);
        assert_eq!(TABLE[255], 0x2D02_EF8D);
    }

    #[test]
    fn matches_crc32fast() {
        let inputs: [&[u8]; 4] = [
            b"",
            b"a",
            b"The quick brown fox jumps over the lazy dog",
            &[0xFF; 1024],
        ];
        for input in inputs {
            assert_eq!(checksum(input), crc32fast::hash(input), "input {input:?}");
        }
    }

    #[test]
    fn incremental_equals_one_shot() {
        let data = b"split across several update calls";
        let mut crc = Crc32::new();
        for chunk in data.chunks(5) {
            crc.update(chunk);
        }
        assert_eq!(crc.finish(), checksum(data));
    }
}
