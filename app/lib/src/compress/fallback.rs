//! Generic fallback compressor.
//!
//! Used when the structural encoding does not reach the configured ratio.
//! The canonical rendering of the model is zstd-compressed behind an 8-byte
//! little-endian length prefix, then base64-encoded so the ALS document stays
//! text.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use zstd::stream::{Decoder, Encoder};

use crate::error::{AlsError, Result};

/// Size of the length prefix in front of the zstd frame.
const LENGTH_PREFIX: usize = 8;

/// Upper bound on the buffer reserved from an untrusted length prefix.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Compress bytes: length prefix followed by one zstd frame.
pub fn compress_bytes(input: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(LENGTH_PREFIX + input.len() / 2);
    output.extend_from_slice(&(input.len() as u64).to_le_bytes());

    let mut encoder = Encoder::new(&mut output, level)
        .map_err(|e| AlsError::EncodingFailure(format!("zstd encoder: {}", e)))?;
    encoder
        .write_all(input)
        .map_err(|e| AlsError::EncodingFailure(format!("zstd write: {}", e)))?;
    // `finish` writes the frame epilogue.
    encoder
        .finish()
        .map_err(|e| AlsError::EncodingFailure(format!("zstd finish: {}", e)))?;

    Ok(output)
}

/// Reverse [`compress_bytes`].
///
/// Fails with [`AlsError::MalformedAlsStream`] at `position` when the prefix
/// is truncated, the frame is corrupt, or the decompressed length differs
/// from the prefix.
pub fn decompress_bytes(input: &[u8], position: usize) -> Result<Vec<u8>> {
    if input.len() < LENGTH_PREFIX {
        return Err(AlsError::malformed(position, "fallback payload is truncated"));
    }
    let (prefix, frame) = input.split_at(LENGTH_PREFIX);
    let mut length = [0u8; LENGTH_PREFIX];
    length.copy_from_slice(prefix);
    let expected = u64::from_le_bytes(length);

    let decoder = Decoder::new(frame)
        .map_err(|e| AlsError::malformed(position, format!("zstd decoder: {}", e)))?;
    let capacity = usize::try_from(expected).unwrap_or(usize::MAX).min(MAX_PREALLOC);
    let mut output = Vec::with_capacity(capacity);
    // Read one byte past the declared length so an overlong frame is caught.
    decoder
        .take(expected.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|e| AlsError::malformed(position, format!("zstd decompress: {}", e)))?;

    if output.len() as u64 != expected {
        return Err(AlsError::malformed(
            position,
            format!(
                "fallback payload length mismatch: header says {}, got {}",
                expected,
                output.len()
            ),
        ));
    }
    Ok(output)
}

/// Compress text into a base64 payload.
pub fn encode_payload(text: &str, level: i32) -> Result<String> {
    let compressed = compress_bytes(text.as_bytes(), level)?;
    Ok(STANDARD.encode(compressed))
}

/// Decode a base64 payload produced by [`encode_payload`] back into text.
pub fn decode_payload(payload: &str, position: usize) -> Result<String> {
    let compressed = STANDARD
        .decode(payload)
        .map_err(|e| AlsError::malformed(position, format!("fallback payload is not base64: {}", e)))?;
    let bytes = decompress_bytes(&compressed, position)?;
    String::from_utf8(bytes)
        .map_err(|e| AlsError::malformed(position, format!("fallback payload is not UTF-8: {}", e)))
}
