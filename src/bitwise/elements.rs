// Scalar and string element codecs for layout fields
//
// Scalars are assembled by shifting each byte in most-significant-first,
// so a value read back is the stored value masked to the element width
// (no sign extension below 64 bits).

use super::types::Endianness;

/// Encode `value` into `dst`, using every byte of the slice as one element.
pub fn encode_scalar(dst: &mut [u8], mut value: i64, endianness: Endianness) {
    let len = dst.len();
    for i in 0..len {
        let pos = match endianness {
            Endianness::Big => len - i - 1,
            Endianness::Little => i,
        };
        dst[pos] = (value & 0xFF) as u8;
        value >>= 8;
    }
}

/// Decode one element spanning the whole of `src`.
pub fn decode_scalar(src: &[u8], endianness: Endianness) -> i64 {
    let fold = |value: i64, byte: &u8| (value << 8) | i64::from(*byte);
    match endianness {
        Endianness::Big => src.iter().fold(0, fold),
        Endianness::Little => src.iter().rev().fold(0, fold),
    }
}

/// Decode bytes as single-byte (ISO-8859-1) text
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode text as single-byte (ISO-8859-1), unmappable characters become `?`
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Truncate a decoded string at its first NUL
pub fn truncate_at_nul(s: &str) -> &str {
    match s.find('\0') {
        Some(idx) => &s[..idx],
        None => s,
    }
}
