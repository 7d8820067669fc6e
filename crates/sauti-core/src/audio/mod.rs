//! Audio pipeline for speech service output

mod buffer;
mod decode;
mod encoder;
mod pcm;
mod wav;

pub use buffer::AudioBuffer;
pub use decode::decode_base64;
pub use encoder::{AudioEncoder, AudioFormat};
pub use pcm::{normalize, pcm_to_channels, RawAudioBytes, BYTES_PER_SAMPLE};
pub use wav::{WavFile, WavHeader, MAX_DATA_LEN, NUM_CHANNELS, WAV_HEADER_LEN};
