//! Speech session: the owned state behind one studio user
//!
//! A session caches the most recent generated audio, owns the playback
//! controller, and gates generation so only one request is outstanding.
//! Generation is split into begin / complete so callers can release any lock
//! around the session while the remote call is in flight.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::{decode_base64, AudioBuffer, RawAudioBytes, WavFile, NUM_CHANNELS};
use crate::config::StudioConfig;
use crate::error::{Error, Result};
use crate::playback::{self, AudioSink, PlaybackController, PlaybackParams, PlaybackState};
use crate::speech::{SpeechGenerator, SpeechRequest, Voice};

/// Proof of an outstanding generation; carries what the remote call needs
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    seq: u64,
    pub request_id: Uuid,
    pub prompt: String,
    pub voice: Voice,
}

/// Summary of the cached audio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub duration_secs: f64,
    pub bytes: usize,
}

pub struct SpeechSession<S: AudioSink> {
    config: StudioConfig,
    controller: PlaybackController<S>,
    audio: Option<RawAudioBytes>,
    buffer: Option<Arc<AudioBuffer>>,
    latest: u64,
    pending: Option<u64>,
}

impl<S: AudioSink> SpeechSession<S> {
    /// Create a session that holds `sink` until shutdown
    pub fn new(config: StudioConfig, sink: S) -> Self {
        Self {
            config,
            controller: PlaybackController::new(sink),
            audio: None,
            buffer: None,
            latest: 0,
            pending: None,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Validate `request` and claim the generation slot.
    ///
    /// Clears the cached audio; playback already in progress keeps going
    /// until the new audio arrives.
    pub fn begin_generation(&mut self, request: &SpeechRequest) -> Result<GenerationTicket> {
        request.validate(self.config.char_limit)?;
        if self.pending.is_some() {
            return Err(Error::Busy);
        }

        self.latest += 1;
        self.pending = Some(self.latest);
        self.audio = None;
        self.buffer = None;

        let ticket = GenerationTicket {
            seq: self.latest,
            request_id: Uuid::new_v4(),
            prompt: request.prompt(),
            voice: request.voice,
        };
        info!(
            "Generation {} started: {} chars, voice {}, tone {}",
            ticket.request_id,
            request.text.chars().count(),
            request.voice,
            request.emotion.id()
        );
        Ok(ticket)
    }

    /// Finish a generation with the remote result.
    ///
    /// Results for tickets older than the newest one are discarded. A
    /// successful result is cached before autoplay, so a playback failure
    /// still leaves the audio available for replay and download.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Option<String>,
        params: PlaybackParams,
    ) -> Result<AudioInfo> {
        self.release_gate(&ticket);

        if ticket.seq != self.latest {
            debug!("Discarding stale generation {}", ticket.request_id);
            return Err(Error::Superseded);
        }

        let encoded = result.ok_or(Error::EmptyResult)?;
        let raw = decode_base64(&encoded)?;
        let buffer = Arc::new(AudioBuffer::from_pcm(
            &raw,
            self.config.sample_rate,
            NUM_CHANNELS,
        )?);

        self.audio = Some(raw);
        self.buffer = Some(buffer.clone());
        let info = self.audio_info().ok_or(Error::NoAudio)?;
        info!(
            "Generation {} produced {:.2}s of audio",
            ticket.request_id, info.duration_secs
        );

        if self.config.autoplay {
            self.controller.play(buffer, params)?;
        }
        Ok(info)
    }

    /// Release the generation slot after the remote call failed
    pub fn abort_generation(&mut self, ticket: GenerationTicket) {
        warn!("Generation {} failed", ticket.request_id);
        self.release_gate(&ticket);
    }

    fn release_gate(&mut self, ticket: &GenerationTicket) {
        if self.pending == Some(ticket.seq) {
            self.pending = None;
        }
    }

    /// Run one full generation against `generator`
    pub async fn generate<G>(
        &mut self,
        generator: &G,
        request: &SpeechRequest,
        params: PlaybackParams,
    ) -> Result<AudioInfo>
    where
        G: SpeechGenerator + ?Sized,
    {
        params.validate()?;
        let ticket = self.begin_generation(request)?;
        match generator.generate(&ticket.prompt, ticket.voice).await {
            Ok(result) => self.complete_generation(ticket, result, params),
            Err(e) => {
                self.abort_generation(ticket);
                Err(e)
            }
        }
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop cached audio, stop playback, and orphan any outstanding
    /// generation so its result is ignored when it arrives
    pub fn discard(&mut self) {
        self.controller.stop();
        self.audio = None;
        self.buffer = None;
        if self.pending.take().is_some() {
            self.latest += 1;
            info!("Outstanding generation will be discarded");
        }
    }

    /// Play the cached audio again with new transforms
    pub fn replay(&mut self, params: PlaybackParams) -> Result<()> {
        let buffer = self.buffer.clone().ok_or(Error::NoAudio)?;
        self.controller.play(buffer, params)
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn playback_state(&mut self) -> PlaybackState {
        self.controller.state()
    }

    /// Parameters of the most recent playback
    pub fn playback_params(&self) -> PlaybackParams {
        self.controller.params()
    }

    /// Build a fresh WAV file from the cached PCM
    pub fn download(&self) -> Result<WavFile> {
        let audio = self.audio.as_ref().ok_or(Error::NoAudio)?;
        WavFile::encode(audio, self.config.sample_rate)
    }

    /// Cached audio with `params` baked in, at `target_rate` or the source rate
    pub fn render(&self, params: PlaybackParams, target_rate: Option<u32>) -> Result<AudioBuffer> {
        let buffer = self.buffer.as_ref().ok_or(Error::NoAudio)?;
        playback::render(buffer, params, target_rate.unwrap_or(buffer.sample_rate()))
    }

    pub fn raw_audio(&self) -> Option<&RawAudioBytes> {
        self.audio.as_ref()
    }

    pub fn audio_info(&self) -> Option<AudioInfo> {
        let audio = self.audio.as_ref()?;
        let buffer = self.buffer.as_ref()?;
        Some(AudioInfo {
            sample_rate: buffer.sample_rate(),
            channels: buffer.channels(),
            frames: buffer.frames(),
            duration_secs: buffer.duration().as_secs_f64(),
            bytes: audio.len(),
        })
    }

    /// Stop playback and release the audio sink
    pub fn shutdown(&mut self) -> Result<()> {
        self.controller.shutdown()
    }
}
