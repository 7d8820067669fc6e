//! Single-session playback state machine

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AudioSink, PlaybackParams, PlaybackSource};
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Owns the audio sink and the one active source, if any.
///
/// The sink is acquired when the controller is built and released exactly
/// once, either by [`shutdown`](Self::shutdown) or on drop.
pub struct PlaybackController<S: AudioSink> {
    sink: Option<S>,
    current: Option<S::Source>,
    params: PlaybackParams,
}

impl<S: AudioSink> PlaybackController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Some(sink),
            current: None,
            params: PlaybackParams::default(),
        }
    }

    /// Start playing `buffer`, stopping any current source first
    pub fn play(&mut self, buffer: Arc<AudioBuffer>, params: PlaybackParams) -> Result<()> {
        params.validate()?;
        if self.sink.is_none() {
            return Err(Error::Playback("audio sink has been released".to_string()));
        }

        self.stop();

        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| Error::Playback("audio sink has been released".to_string()))?;

        let frames = buffer.frames();
        let mut source = sink.create_source(buffer, params)?;
        if let Err(e) = source.connect().and_then(|_| source.start()) {
            source.stop();
            return Err(e);
        }

        info!(
            "Playing {} frames at speed {:.2}, pitch {:+} cents",
            frames, params.speed, params.pitch
        );
        self.current = Some(source);
        self.params = params;
        Ok(())
    }

    /// Stop the current source, if any
    pub fn stop(&mut self) {
        if let Some(mut source) = self.current.take() {
            source.stop();
            debug!("Stopped playback");
        }
    }

    /// Current state; a source that reached its end counts as idle
    pub fn state(&mut self) -> PlaybackState {
        if self
            .current
            .as_ref()
            .map(|source| source.is_finished())
            .unwrap_or(false)
        {
            debug!("Playback reached end of buffer");
            self.current = None;
        }

        if self.current.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_playing(&mut self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Parameters of the most recent successful play
    pub fn params(&self) -> PlaybackParams {
        self.params
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.sink.is_none()
    }

    /// Stop playback and release the sink. Later calls do nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop();
        match self.sink.take() {
            Some(mut sink) => {
                info!("Releasing audio sink");
                sink.release()
            }
            None => Ok(()),
        }
    }
}

impl<S: AudioSink> Drop for PlaybackController<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to release audio sink: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MemorySink, PlaybackEvent};

    fn buffer() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::silent(1, 2400, 24000).unwrap())
    }

    #[test]
    fn test_play_and_stop() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        let mut controller = PlaybackController::new(sink);

        assert_eq!(controller.state(), PlaybackState::Idle);
        controller.play(buffer(), PlaybackParams::default()).unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(probe.active(), 1);

        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(probe.active(), 0);
    }

    #[test]
    fn test_second_play_supersedes_first() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        let mut controller = PlaybackController::new(sink);

        controller.play(buffer(), PlaybackParams::default()).unwrap();
        controller
            .play(buffer(), PlaybackParams::new(1.5, 200.0).unwrap())
            .unwrap();

        assert_eq!(probe.active(), 1);
        assert_eq!(probe.started(), 2);
        assert_eq!(probe.stopped(), 1);
        assert_eq!(probe.last_params(), Some(PlaybackParams::new(1.5, 200.0).unwrap()));
        assert_eq!(
            probe.events(),
            vec![
                PlaybackEvent::Started(0),
                PlaybackEvent::Stopped(0),
                PlaybackEvent::Started(1),
            ]
        );
        assert_eq!(controller.params().speed, 1.5);
    }

    #[test]
    fn test_natural_end_returns_to_idle() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        let mut controller = PlaybackController::new(sink);

        controller.play(buffer(), PlaybackParams::default()).unwrap();
        probe.finish_all();
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_invalid_params_keep_current_session() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        let mut controller = PlaybackController::new(sink);

        controller.play(buffer(), PlaybackParams::default()).unwrap();
        let bad = PlaybackParams {
            speed: 3.0,
            pitch: 0.0,
        };
        assert!(matches!(
            controller.play(buffer(), bad),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(probe.active(), 1);
    }

    #[test]
    fn test_unavailable_sink_surfaces_error() {
        let sink = MemorySink::unavailable();
        let probe = sink.probe();
        let mut controller = PlaybackController::new(sink);

        assert!(matches!(
            controller.play(buffer(), PlaybackParams::default()),
            Err(Error::Playback(_))
        ));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(probe.active(), 0);
    }

    #[test]
    fn test_shutdown_releases_once() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        {
            let mut controller = PlaybackController::new(sink);
            controller.play(buffer(), PlaybackParams::default()).unwrap();
            controller.shutdown().unwrap();
            controller.shutdown().unwrap();
            assert!(controller.is_released());
            assert!(matches!(
                controller.play(buffer(), PlaybackParams::default()),
                Err(Error::Playback(_))
            ));
        }
        assert_eq!(probe.active(), 0);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_drop_releases_sink() {
        let sink = MemorySink::new();
        let probe = sink.probe();
        {
            let mut controller = PlaybackController::new(sink);
            controller.play(buffer(), PlaybackParams::default()).unwrap();
        }
        assert_eq!(probe.active(), 0);
        assert_eq!(probe.releases(), 1);
    }
}
