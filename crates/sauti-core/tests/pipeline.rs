//! End-to-end checks of the decode -> buffer / WAV pipeline

use base64::Engine;
use std::io::Cursor;

use sauti_core::audio::{WavHeader, WAV_HEADER_LEN};
use sauti_core::{decode_base64, AudioBuffer, WavFile};

fn sine_pcm(frames: usize, rate: u32) -> Vec<u8> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / rate as f32;
            ((t * 220.0 * std::f32::consts::TAU).sin() * 12000.0) as i16
        })
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

#[test]
fn speech_payload_to_wav_and_buffer() {
    let pcm = sine_pcm(2400, 24000);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pcm);

    let raw = decode_base64(&encoded).unwrap();
    assert_eq!(&raw[..], pcm.as_slice());

    let buffer = AudioBuffer::from_pcm(&raw, 24000, 1).unwrap();
    assert_eq!(buffer.frames(), 2400);
    assert!((buffer.duration().as_secs_f64() - 0.1).abs() < 1e-9);

    let wav = WavFile::encode(&raw, 24000).unwrap();
    assert_eq!(wav.len(), WAV_HEADER_LEN + pcm.len());
    assert_eq!(&wav.as_bytes()[WAV_HEADER_LEN..], pcm.as_slice());
}

#[test]
fn wav_output_is_accepted_by_hound() {
    let pcm = sine_pcm(480, 24000);
    let wav = WavFile::encode(&pcm, 24000).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav.into_bytes())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 24000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    let expected: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(samples, expected);
}

#[test]
fn wav_samples_match_buffer_samples() {
    let pcm = sine_pcm(100, 24000);
    let raw = decode_base64(&base64::engine::general_purpose::STANDARD.encode(&pcm)).unwrap();
    let buffer = AudioBuffer::from_pcm(&raw, 24000, 1).unwrap();

    let wav = WavFile::encode(&pcm, 24000).unwrap();
    let header = WavHeader::parse(wav.as_bytes()).unwrap();
    assert_eq!(header.data_size as usize, pcm.len());

    for (bytes, &sample) in wav.data().chunks_exact(2).zip(buffer.channel_data(0).unwrap()) {
        let int = i16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(int as f32 / 32768.0, sample);
    }
}

#[test]
fn odd_length_payload_survives_wav_round_trip() {
    let raw = decode_base64("AQID").unwrap();
    assert_eq!(raw.len(), 3);

    let wav = WavFile::encode(&raw, 24000).unwrap();
    assert_eq!(wav.data(), &raw[..]);
    assert_eq!(wav.header().unwrap().chunk_size, 39);

    let buffer = AudioBuffer::from_pcm(&raw, 24000, 1).unwrap();
    assert_eq!(buffer.frames(), 1);
}
