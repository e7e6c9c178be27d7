//! Base64 decoding for embedded template images and user photos
//!
//! Payloads arrive as standard-alphabet base64 strings, either embedded in a
//! template or forwarded by the UI. Decoding is done here rather than through
//! a general-purpose decoder so that the output length is computed up front
//! from the padding and partial trailing groups are handled explicitly.

use thiserror::Error;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Errors produced while decoding a base64 payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input length is not a multiple of four
    #[error("base64 payload length {len} is not a multiple of 4")]
    Length { len: usize },

    /// A character outside the standard alphabet
    #[error("invalid base64 character {found:?} at offset {offset}")]
    InvalidCharacter { found: char, offset: usize },
}

/// Decode a standard base64 string into raw bytes.
///
/// The output length is `len * 3 / 4 - pad`, where `pad` is 2 when the last
/// two characters are `=`, 1 when only the last one is, and 0 otherwise.
pub fn decode(input: &str) -> Result<Vec<u8>, CodecError> {
    let input = input.trim().as_bytes();
    let len = input.len();
    if len % 4 != 0 {
        return Err(CodecError::Length { len });
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let pad = if input[len - 1] != b'=' {
        0
    } else if input[len - 2] == b'=' {
        2
    } else {
        1
    };
    let byte_len = len * 3 / 4 - pad;
    let mut bytes = Vec::with_capacity(byte_len);

    for (group_index, group) in input.chunks_exact(4).enumerate() {
        let offset = group_index * 4;
        let is_last = offset + 4 == len;
        let mut sextets = [0u8; 4];
        for (i, &c) in group.iter().enumerate() {
            // Padding is only legal in the positions accounted for by `pad`
            if c == b'=' && is_last && i >= 4 - pad {
                continue;
            }
            sextets[i] = sextet(c).ok_or(CodecError::InvalidCharacter {
                found: c as char,
                offset: offset + i,
            })?;
        }

        let [a, b, c, d] = sextets;
        bytes.push((a << 2) | (b >> 4));
        if bytes.len() < byte_len {
            bytes.push(((b & 0x0f) << 4) | (c >> 2));
        }
        if bytes.len() < byte_len {
            bytes.push(((c & 0x03) << 6) | d);
        }
    }

    Ok(bytes)
}

fn sextet(c: u8) -> Option<u8> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}
