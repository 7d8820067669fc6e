//! Sauti Core - speech audio pipeline
//!
//! Turns the base64 PCM returned by a hosted text-to-speech service into
//! playable, downloadable audio.
//!
//! # Architecture
//!
//! - [`audio`]: base64 decoding, PCM conversion, buffers, WAV containers
//! - [`playback`]: single-session playback control over an [`AudioSink`]
//! - [`speech`]: request shaping and the remote [`SpeechGenerator`] contract
//! - [`session`]: the owned state tying generation, playback and download
//!
//! # Example
//!
//! ```ignore
//! use sauti_core::{MemorySink, PlaybackParams, SpeechRequest, SpeechSession, StudioConfig};
//!
//! let mut session = SpeechSession::new(StudioConfig::default(), MemorySink::new());
//! let request = SpeechRequest::new("Hello, world!");
//! session.generate(&client, &request, PlaybackParams::default()).await?;
//! let wav = session.download()?;
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod speech;

pub use audio::{decode_base64, AudioBuffer, AudioEncoder, AudioFormat, RawAudioBytes, WavFile};
pub use config::{AudioOutput, GeminiConfig, ServerConfig, StudioConfig};
pub use error::{Error, Result};
#[cfg(feature = "device")]
pub use playback::DeviceSink;
pub use playback::{
    AudioSink, MemoryProbe, MemorySink, PlaybackController, PlaybackEvent, PlaybackParams,
    PlaybackSource, PlaybackState,
};
pub use session::{AudioInfo, GenerationTicket, SpeechSession};
pub use speech::{Emotion, GeminiSpeechClient, SpeechGenerator, SpeechRequest, Voice};
