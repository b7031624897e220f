//! Bit-to-text decoding.
//!
//! Each 8-bit group, MSB first, is one character whose code point is the
//! byte value (Latin-1). Control characters pass through untouched.

use super::{validate::{bits_to_byte, byte_to_bits}, EncodeError, FrameError};

/// Decodes byte-aligned bits into text.
pub fn decode(bits: &[u8]) -> Result<String, FrameError> {
    if bits.len() % 8 != 0 {
        return Err(FrameError::NotByteAligned { len: bits.len() });
    }
    Ok(bits
        .chunks_exact(8)
        .map(|byte| char::from(bits_to_byte(byte)))
        .collect())
}

/// Expands text into bits, eight per character.
///
/// Fails for characters above U+00FF, which have no single-byte form.
pub fn encode_text(text: &str) -> Result<Vec<u8>, EncodeError> {
    let mut bits = Vec::with_capacity(text.len() * 8);
    for ch in text.chars() {
        let byte = u8::try_from(u32::from(ch)).map_err(|_| EncodeError::UnrepresentableChar(ch))?;
        bits.extend(byte_to_bits(byte));
    }
    Ok(bits)
}
