//! 16-bit little-endian PCM conversions for the wire.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{SessionError, SessionResult};

/// Interleaved i16 samples → little-endian bytes.
pub fn encode_pcm16(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Base64 payload of little-endian PCM → samples.
pub fn decode_pcm16(payload: &str) -> SessionResult<Vec<i16>> {
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| SessionError::Decode(format!("invalid base64: {}", e)))?;
    if bytes.len() % 2 != 0 {
        return Err(SessionError::Decode(format!(
            "odd PCM payload length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}
