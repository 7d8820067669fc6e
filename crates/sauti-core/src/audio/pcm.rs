//! Raw 16-bit PCM and its conversion to normalized float samples

use bytes::Bytes;
use std::ops::Deref;
use tracing::debug;

use crate::error::{Error, Result};

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = 2;

/// Divisor mapping i16 onto [-1.0, 1.0)
const I16_SCALE: f32 = 32768.0;

/// Interleaved signed 16-bit little-endian PCM, as returned by the speech
/// service. Cloning is cheap; the underlying buffer is shared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawAudioBytes(Bytes);

impl RawAudioBytes {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of whole 16-bit samples
    pub fn sample_count(&self) -> usize {
        self.0.len() / BYTES_PER_SAMPLE
    }

    /// Number of whole frames for the given channel count
    pub fn frame_count(&self, channels: u16) -> usize {
        if channels == 0 {
            return 0;
        }
        self.sample_count() / channels as usize
    }

    /// Iterate over the whole i16 samples, dropping an odd trailing byte
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.0
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for RawAudioBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RawAudioBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawAudioBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for RawAudioBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// Split interleaved PCM into one normalized sample vector per channel.
///
/// Every returned vector holds `floor(samples / channels)` values; a trailing
/// partial frame is dropped.
pub fn pcm_to_channels(raw: &RawAudioBytes, channels: u16) -> Result<Vec<Vec<f32>>> {
    if channels == 0 {
        return Err(Error::InvalidParameter(
            "channel count must be at least 1".to_string(),
        ));
    }

    let channel_count = channels as usize;
    let frames = raw.frame_count(channels);
    let dropped_bytes = raw.len() - frames * channel_count * BYTES_PER_SAMPLE;
    if dropped_bytes > 0 {
        debug!("Dropping {} trailing bytes of partial PCM frame", dropped_bytes);
    }

    let mut output: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frames))
        .collect();

    for (i, sample) in raw.samples().take(frames * channel_count).enumerate() {
        output[i % channel_count].push(normalize(sample));
    }

    Ok(output)
}

/// Map one i16 sample into [-1.0, 1.0)
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}
