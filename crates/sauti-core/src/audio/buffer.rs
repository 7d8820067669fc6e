//! In-memory audio buffer addressable by an audio sink

use std::time::Duration;

use super::pcm::{pcm_to_channels, RawAudioBytes};
use crate::error::{Error, Result};

/// Sample-rate tagged, fixed-length, per-channel float audio.
///
/// Every channel holds exactly `frames` samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    frames: usize,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Allocate a zero-filled buffer for the caller to fill per channel
    pub fn silent(channels: u16, frames: usize, sample_rate: u32) -> Result<Self> {
        validate_shape(channels, sample_rate)?;
        Ok(Self {
            sample_rate,
            frames,
            channels: vec![vec![0.0; frames]; channels as usize],
        })
    }

    /// Build a buffer from already separated channel data
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let count = u16::try_from(channels.len())
            .map_err(|_| Error::InvalidParameter("too many channels".to_string()))?;
        validate_shape(count, sample_rate)?;

        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Error::InvalidParameter(
                "all channels must have the same length".to_string(),
            ));
        }

        Ok(Self {
            sample_rate,
            frames,
            channels,
        })
    }

    /// Convert interleaved 16-bit PCM into a playable buffer
    pub fn from_pcm(raw: &RawAudioBytes, sample_rate: u32, channels: u16) -> Result<Self> {
        validate_shape(channels, sample_rate)?;
        let converted = pcm_to_channels(raw, channels)?;
        let mut buffer = Self::silent(channels, raw.frame_count(channels), sample_rate)?;
        for (index, samples) in converted.into_iter().enumerate() {
            buffer.channel_data_mut(index)?.copy_from_slice(&samples);
        }
        Ok(buffer)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn channel_data(&self, channel: usize) -> Result<&[f32]> {
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .ok_or_else(|| channel_out_of_range(channel, self.channels.len()))
    }

    pub fn channel_data_mut(&mut self, channel: usize) -> Result<&mut [f32]> {
        let count = self.channels.len();
        self.channels
            .get_mut(channel)
            .map(Vec::as_mut_slice)
            .ok_or_else(|| channel_out_of_range(channel, count))
    }

    /// All channels, each `frames` long
    pub fn planes(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Interleave channels frame by frame
    pub fn interleaved(&self) -> Vec<f32> {
        let mut output = Vec::with_capacity(self.frames * self.channels.len());
        for frame in 0..self.frames {
            for channel in &self.channels {
                output.push(channel[frame]);
            }
        }
        output
    }
}

fn validate_shape(channels: u16, sample_rate: u32) -> Result<()> {
    if channels == 0 {
        return Err(Error::InvalidParameter(
            "channel count must be at least 1".to_string(),
        ));
    }
    if sample_rate == 0 {
        return Err(Error::InvalidParameter(
            "sample rate must be positive".to_string(),
        ));
    }
    Ok(())
}

fn channel_out_of_range(channel: usize, count: usize) -> Error {
    Error::InvalidParameter(format!(
        "channel {} out of range for {}-channel buffer",
        channel, count
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_buffer_can_be_filled() {
        let mut buffer = AudioBuffer::silent(2, 4, 24000).unwrap();
        buffer
            .channel_data_mut(1)
            .unwrap()
            .copy_from_slice(&[0.1, 0.2, 0.3, 0.4]);

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 4);
        assert_eq!(buffer.channel_data(0).unwrap(), &[0.0; 4]);
        assert_eq!(buffer.channel_data(1).unwrap()[2], 0.3);
        assert!(buffer.channel_data(2).is_err());
    }

    #[test]
    fn test_from_pcm_mono() {
        let raw = RawAudioBytes::from(vec![0x00, 0x40, 0x00, 0xC0, 0x01]);
        let buffer = AudioBuffer::from_pcm(&raw, 24000, 1).unwrap();
        assert_eq!(buffer.sample_rate(), 24000);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel_data(0).unwrap(), &[0.5, -0.5]);
    }

    #[test]
    fn test_duration() {
        let raw = RawAudioBytes::from(vec![0u8; 48000]);
        let buffer = AudioBuffer::from_pcm(&raw, 24000, 1).unwrap();
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_interleaved_round_trip() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![0.1, 0.3], vec![0.2, 0.4]], 16000).unwrap();
        assert_eq!(buffer.interleaved(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(AudioBuffer::silent(0, 10, 24000).is_err());
        assert!(AudioBuffer::silent(1, 10, 0).is_err());
        assert!(AudioBuffer::from_channels(vec![], 24000).is_err());
        assert!(AudioBuffer::from_channels(vec![vec![0.0], vec![]], 24000).is_err());
    }
}
