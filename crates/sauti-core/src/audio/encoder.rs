//! Export of rendered float buffers to downloadable formats

use hound::{WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

use super::buffer::AudioBuffer;
use crate::error::{Error, Result};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV container, 16-bit PCM
    #[default]
    Wav,
    /// Raw interleaved f32 little-endian samples
    F32,
    /// Raw interleaved i16 little-endian samples
    I16,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::F32 => "f32",
            AudioFormat::I16 => "pcm",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "f32" => Ok(AudioFormat::F32),
            "i16" | "pcm" => Ok(AudioFormat::I16),
            other => Err(Error::InvalidInput(format!("unknown audio format: {}", other))),
        }
    }
}

/// Encoder for turning float buffers into byte payloads
pub struct AudioEncoder {
    sample_rate: u32,
    channels: u16,
}

impl AudioEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Encoder matching a buffer's own rate and layout
    pub fn for_buffer(buffer: &AudioBuffer) -> Self {
        Self::new(buffer.sample_rate(), buffer.channels())
    }

    /// Encode a buffer to the specified format
    pub fn encode(&self, buffer: &AudioBuffer, format: AudioFormat) -> Result<Vec<u8>> {
        if buffer.channels() != self.channels {
            return Err(Error::AudioError(format!(
                "encoder expects {} channels, buffer has {}",
                self.channels,
                buffer.channels()
            )));
        }

        let samples = buffer.interleaved();
        match format {
            AudioFormat::Wav => self.encode_wav(&samples),
            AudioFormat::F32 => Ok(encode_raw_f32(&samples)),
            AudioFormat::I16 => Ok(encode_raw_i16(&samples)),
        }
    }

    fn encode_wav(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in samples {
                writer.write_sample(to_i16(sample))?;
            }
            writer.finalize()?;
        }

        debug!(
            "Encoded {} samples to WAV ({} bytes)",
            samples.len(),
            cursor.get_ref().len()
        );
        Ok(cursor.into_inner())
    }

    pub fn content_type(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::F32 | AudioFormat::I16 => "application/octet-stream",
        }
    }
}

fn encode_raw_f32(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn encode_raw_i16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| to_i16(s).to_le_bytes())
        .collect()
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![0.0, 0.5, -0.5, 2.0]], 24000).unwrap()
    }

    #[test]
    fn test_raw_i16_clamps() {
        let bytes = AudioEncoder::new(24000, 1)
            .encode(&buffer(), AudioFormat::I16)
            .unwrap();
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![0, 16383, -16383, 32767]);
    }

    #[test]
    fn test_raw_f32_len() {
        let bytes = AudioEncoder::new(24000, 1)
            .encode(&buffer(), AudioFormat::F32)
            .unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..8], &0.5f32.to_le_bytes());
    }

    #[test]
    fn test_wav_readable_by_hound() {
        let bytes = AudioEncoder::for_buffer(&buffer())
            .encode(&buffer(), AudioFormat::Wav)
            .unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn test_channel_mismatch() {
        assert!(AudioEncoder::new(24000, 2)
            .encode(&buffer(), AudioFormat::Wav)
            .is_err());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("WAV".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert_eq!("pcm".parse::<AudioFormat>().unwrap(), AudioFormat::I16);
        assert!("mp3".parse::<AudioFormat>().is_err());
        assert_eq!(AudioEncoder::content_type(AudioFormat::Wav), "audio/wav");
    }
}
