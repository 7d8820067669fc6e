//! Playback of decoded speech through an audio sink
//!
//! A [`PlaybackController`] owns one [`AudioSink`] and at most one active
//! [`PlaybackSource`]. Starting a new source always stops the previous one
//! first, so only one session is ever audible.

mod controller;
#[cfg(feature = "device")]
mod device;
mod memory;
mod render;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

pub use controller::{PlaybackController, PlaybackState};
#[cfg(feature = "device")]
pub use device::{DeviceSink, DeviceSource};
pub use memory::{MemoryProbe, MemorySink, MemorySource, PlaybackEvent};
pub use render::render;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const MIN_PITCH_CENTS: f32 = -1200.0;
pub const MAX_PITCH_CENTS: f32 = 1200.0;

/// Runtime transforms applied to a playing source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackParams {
    /// Playback-rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Detune in cents
    #[serde(default)]
    pub pitch: f32,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            pitch: 0.0,
        }
    }
}

fn default_speed() -> f32 {
    1.0
}

impl PlaybackParams {
    pub fn new(speed: f32, pitch: f32) -> Result<Self> {
        let params = Self { speed, pitch };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(Error::InvalidParameter(format!(
                "speed {} outside {}..={}",
                self.speed, MIN_SPEED, MAX_SPEED
            )));
        }
        if !(MIN_PITCH_CENTS..=MAX_PITCH_CENTS).contains(&self.pitch) {
            return Err(Error::InvalidParameter(format!(
                "pitch {} cents outside {}..={}",
                self.pitch, MIN_PITCH_CENTS, MAX_PITCH_CENTS
            )));
        }
        Ok(())
    }

    /// Combined rate of rate and detune: `speed * 2^(cents / 1200)`
    pub fn effective_rate(&self) -> f64 {
        self.speed as f64 * 2f64.powf(self.pitch as f64 / 1200.0)
    }

    pub fn is_identity(&self) -> bool {
        self.speed == 1.0 && self.pitch == 0.0
    }
}

/// A sound-producing instance bound to one buffer
pub trait PlaybackSource: Send {
    /// Route the source to the sink's output
    fn connect(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    /// Silence the source immediately. Safe to call more than once.
    fn stop(&mut self);

    /// True once the buffer has played to its end or the source was stopped
    fn is_finished(&self) -> bool;
}

/// Host audio output capability
pub trait AudioSink: Send {
    type Source: PlaybackSource;

    /// Construct an empty buffer for the caller to fill per channel
    fn create_buffer(&self, channels: u16, frames: usize, sample_rate: u32) -> Result<AudioBuffer> {
        AudioBuffer::silent(channels, frames, sample_rate)
    }

    /// Create a playable source applying `params` for its whole duration
    fn create_source(&mut self, buffer: Arc<AudioBuffer>, params: PlaybackParams)
        -> Result<Self::Source>;

    /// Release the underlying output resource
    fn release(&mut self) -> Result<()>;
}
