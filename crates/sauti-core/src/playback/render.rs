//! Offline rendering of speed and pitch transforms
//!
//! Rate and detune compose into one effective rate, so the transform is a
//! single resampling pass: playing the result at `target_rate` advances
//! through the source `effective_rate` times faster than real time.

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use super::PlaybackParams;
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 1024;

/// Resampler output rates are rounded to this step to keep FFT sizes small
const RATE_STEP: f64 = 100.0;

/// Resample `buffer` so that playback at `target_rate` applies `params`
pub fn render(buffer: &AudioBuffer, params: PlaybackParams, target_rate: u32) -> Result<AudioBuffer> {
    params.validate()?;
    if target_rate == 0 {
        return Err(Error::InvalidParameter(
            "target rate must be positive".to_string(),
        ));
    }

    let input_rate = buffer.sample_rate() as usize;
    let output_rate = resampler_output_rate(target_rate, params.effective_rate());

    if output_rate == input_rate || buffer.is_empty() {
        return AudioBuffer::from_channels(buffer.planes().to_vec(), target_rate);
    }

    let expected = (buffer.frames() as u128 * output_rate as u128 / input_rate as u128) as usize;
    let channels = resample(buffer.planes(), input_rate, output_rate, expected)?;

    debug!(
        "Rendered {} frames at {} Hz into {} frames for {} Hz (effective rate {:.3})",
        buffer.frames(),
        input_rate,
        expected,
        target_rate,
        params.effective_rate()
    );
    AudioBuffer::from_channels(channels, target_rate)
}

fn resampler_output_rate(target_rate: u32, effective_rate: f64) -> usize {
    let exact = target_rate as f64 / effective_rate;
    let stepped = (exact / RATE_STEP).round() * RATE_STEP;
    // Integral rates are used as-is
    if (exact - exact.round()).abs() < 1e-6 || stepped < RATE_STEP {
        exact.round().max(1.0) as usize
    } else {
        stepped as usize
    }
}

fn resample(
    planes: &[Vec<f32>],
    input_rate: usize,
    output_rate: usize,
    expected: usize,
) -> Result<Vec<Vec<f32>>> {
    let channel_count = planes.len();
    let mut resampler =
        FftFixedIn::<f32>::new(input_rate, output_rate, CHUNK_SIZE, 2, channel_count)
            .map_err(|e| Error::AudioError(format!("failed to create resampler: {}", e)))?;

    let frames = planes.first().map(Vec::len).unwrap_or(0);
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected); channel_count];
    let mut pos = 0;

    // Zero-padded chunks past the end flush the resampler's delay line
    while pos < frames || output[0].len() < expected {
        let needed = resampler.input_frames_next();
        let start = pos.min(frames);
        let end = (pos + needed).min(frames);

        let chunk: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| {
                let mut part = plane[start..end].to_vec();
                part.resize(needed, 0.0);
                part
            })
            .collect();

        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| Error::AudioError(format!("resampling failed: {}", e)))?;
        for (out, part) in output.iter_mut().zip(processed) {
            out.extend(part);
        }

        pos += needed;
    }

    for channel in &mut output {
        channel.truncate(expected);
        channel.resize(expected, 0.0);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize, rate: u32) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 0.5)
            .collect();
        AudioBuffer::from_channels(vec![samples], rate).unwrap()
    }

    #[test]
    fn test_identity_is_a_copy() {
        let buffer = tone(2400, 24000);
        let rendered = render(&buffer, PlaybackParams::default(), 24000).unwrap();
        assert_eq!(rendered, buffer);
    }

    #[test]
    fn test_double_speed_halves_length() {
        let buffer = tone(24000, 24000);
        let rendered = render(&buffer, PlaybackParams::new(2.0, 0.0).unwrap(), 24000).unwrap();
        assert_eq!(rendered.sample_rate(), 24000);
        assert_eq!(rendered.frames(), 12000);
    }

    #[test]
    fn test_octave_down_doubles_length() {
        let buffer = tone(12000, 24000);
        let rendered = render(&buffer, PlaybackParams::new(1.0, -1200.0).unwrap(), 24000).unwrap();
        assert_eq!(rendered.frames(), 24000);
    }

    #[test]
    fn test_speed_and_pitch_cancel() {
        let buffer = tone(4800, 24000);
        let rendered = render(&buffer, PlaybackParams::new(2.0, -1200.0).unwrap(), 24000).unwrap();
        assert_eq!(rendered.frames(), 4800);
    }

    #[test]
    fn test_device_rate_conversion() {
        let buffer = tone(24000, 24000);
        let rendered = render(&buffer, PlaybackParams::default(), 48000).unwrap();
        assert_eq!(rendered.sample_rate(), 48000);
        assert_eq!(rendered.frames(), 48000);
        assert!(rendered
            .channel_data(0)
            .unwrap()
            .iter()
            .any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_output_rate_rounding() {
        assert_eq!(resampler_output_rate(24000, 1.0), 24000);
        assert_eq!(resampler_output_rate(24000, 2.0), 12000);
        assert_eq!(resampler_output_rate(48000, 1.3), 36900);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = AudioBuffer::silent(1, 0, 24000).unwrap();
        let rendered = render(&buffer, PlaybackParams::new(1.5, 100.0).unwrap(), 44100).unwrap();
        assert!(rendered.is_empty());
        assert_eq!(rendered.sample_rate(), 44100);
    }
}
