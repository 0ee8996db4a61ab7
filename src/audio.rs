//! Inbound audio framing
//!
//! Frames carry 16-bit signed little-endian PCM, 16 kHz, mono. The core
//! never interprets sample content beyond VAD energy and handing bytes to
//! the [`crate::transcriber::Transcriber`]; format enforcement here is
//! limited to the size bounds a frame must satisfy.

use crate::{Error, Result};

/// Minimum audio frame size, in bytes (roughly 10 ms at 16 kHz mono 16-bit)
pub const MIN_FRAME_BYTES: usize = 320;

/// Maximum audio frame size, in bytes
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Sample rate the core assumes for all incoming audio
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// An immutable chunk of 16-bit signed little-endian PCM audio
#[derive(Debug, Clone)]
pub struct AudioFrame {
    bytes: std::sync::Arc<[u8]>,
    /// Monotonic sequence number assigned by the ingest queue, used to
    /// prove arrival-order processing in tests.
    pub sequence: u64,
}

impl AudioFrame {
    /// Build a frame from raw bytes, enforcing the size bounds in §6.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `bytes` is smaller than
    /// [`MIN_FRAME_BYTES`], larger than [`MAX_FRAME_BYTES`], or an odd
    /// number of bytes (not a whole number of 16-bit samples).
    pub fn new(bytes: impl Into<Vec<u8>>, sequence: u64) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() % 2 != 0 {
            return Err(Error::Validation(
                "audio frame length must be a multiple of 2 bytes (16-bit samples)".to_string(),
            ));
        }
        if bytes.len() < MIN_FRAME_BYTES {
            return Err(Error::Validation(format!(
                "audio frame too small: {} bytes (min {})",
                bytes.len(),
                MIN_FRAME_BYTES
            )));
        }
        if bytes.len() > MAX_FRAME_BYTES {
            return Err(Error::Validation(format!(
                "audio frame too large: {} bytes (max {})",
                bytes.len(),
                MAX_FRAME_BYTES
            )));
        }
        Ok(Self {
            bytes: bytes.into(),
            sequence,
        })
    }

    /// Raw PCM bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode to signed 16-bit samples
    pub fn samples(&self) -> Vec<i16> {
        self.bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    /// Approximate duration of this frame, in milliseconds
    pub fn duration_ms(&self) -> u32 {
        let num_samples = self.bytes.len() / 2;
        ((num_samples as u64 * 1000) / SAMPLE_RATE_HZ as u64) as u32
    }
}
