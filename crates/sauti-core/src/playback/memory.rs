//! Headless sink that records playback activity instead of producing sound

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{AudioSink, PlaybackParams, PlaybackSource};
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStatus {
    Created,
    Connected,
    Playing,
    Stopped,
    Finished,
}

/// Recent events kept for inspection
const EVENT_HISTORY: usize = 64;

/// A playback transition observed by a [`MemorySink`], tagged with the source id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started(u64),
    Stopped(u64),
    Finished(u64),
}

#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    /// Live sources only; entries leave when their source is dropped
    sources: HashMap<u64, SourceStatus>,
    events: VecDeque<PlaybackEvent>,
    started: usize,
    stopped: usize,
    releases: usize,
    last_params: Option<PlaybackParams>,
    last_frames: Option<usize>,
    unavailable: bool,
}

impl Ledger {
    fn record(&mut self, event: PlaybackEvent) {
        if self.events.len() == EVENT_HISTORY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

type Shared = Arc<Mutex<Ledger>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Ledger> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink for headless servers and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    shared: Shared,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose sources can never be created
    pub fn unavailable() -> Self {
        let sink = Self::default();
        lock(&sink.shared).unavailable = true;
        sink
    }

    /// Observer handle that outlives the sink
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            shared: self.shared.clone(),
        }
    }
}

impl AudioSink for MemorySink {
    type Source = MemorySource;

    fn create_source(
        &mut self,
        buffer: Arc<AudioBuffer>,
        params: PlaybackParams,
    ) -> Result<MemorySource> {
        let mut ledger = lock(&self.shared);
        if ledger.unavailable {
            return Err(Error::Playback("memory sink is unavailable".to_string()));
        }

        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.sources.insert(id, SourceStatus::Created);
        ledger.last_params = Some(params);
        ledger.last_frames = Some(buffer.frames());

        Ok(MemorySource {
            id,
            shared: self.shared.clone(),
        })
    }

    fn release(&mut self) -> Result<()> {
        let mut ledger = lock(&self.shared);
        let mut silenced = Vec::new();
        for (id, status) in ledger.sources.iter_mut() {
            if *status == SourceStatus::Playing {
                *status = SourceStatus::Stopped;
                silenced.push(*id);
            }
        }
        for id in silenced {
            ledger.record(PlaybackEvent::Stopped(id));
        }
        ledger.releases += 1;
        debug!("Memory sink released");
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemorySource {
    id: u64,
    shared: Shared,
}

impl MemorySource {
    fn transition(&self, from: SourceStatus, to: SourceStatus) -> Result<()> {
        let mut ledger = lock(&self.shared);
        match ledger.sources.get_mut(&self.id) {
            Some(status) if *status == from => {
                *status = to;
                Ok(())
            }
            Some(status) => Err(Error::Playback(format!(
                "source {} is {:?}, expected {:?}",
                self.id, status, from
            ))),
            None => Err(Error::Playback(format!("unknown source {}", self.id))),
        }
    }
}

impl PlaybackSource for MemorySource {
    fn connect(&mut self) -> Result<()> {
        self.transition(SourceStatus::Created, SourceStatus::Connected)
    }

    fn start(&mut self) -> Result<()> {
        self.transition(SourceStatus::Connected, SourceStatus::Playing)?;
        let mut ledger = lock(&self.shared);
        ledger.started += 1;
        ledger.record(PlaybackEvent::Started(self.id));
        Ok(())
    }

    fn stop(&mut self) {
        let mut ledger = lock(&self.shared);
        let was_playing = matches!(
            ledger.sources.get(&self.id),
            Some(SourceStatus::Playing)
        );
        if let Some(status) = ledger.sources.get_mut(&self.id) {
            if *status != SourceStatus::Finished {
                *status = SourceStatus::Stopped;
            }
        }
        if was_playing {
            ledger.stopped += 1;
            ledger.record(PlaybackEvent::Stopped(self.id));
        }
    }

    fn is_finished(&self) -> bool {
        matches!(
            lock(&self.shared).sources.get(&self.id),
            Some(SourceStatus::Finished) | Some(SourceStatus::Stopped) | None
        )
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        lock(&self.shared).sources.remove(&self.id);
    }
}

/// Read-only view of a [`MemorySink`]'s activity
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    shared: Shared,
}

impl MemoryProbe {
    /// Sources currently playing
    pub fn active(&self) -> usize {
        lock(&self.shared)
            .sources
            .values()
            .filter(|status| **status == SourceStatus::Playing)
            .count()
    }

    pub fn started(&self) -> usize {
        lock(&self.shared).started
    }

    /// Sources stopped while still playing
    pub fn stopped(&self) -> usize {
        lock(&self.shared).stopped
    }

    /// Most recent transitions, oldest first
    pub fn events(&self) -> Vec<PlaybackEvent> {
        lock(&self.shared).events.iter().copied().collect()
    }

    /// Sources still held by a caller
    pub fn live_sources(&self) -> usize {
        lock(&self.shared).sources.len()
    }

    pub fn releases(&self) -> usize {
        lock(&self.shared).releases
    }

    pub fn last_params(&self) -> Option<PlaybackParams> {
        lock(&self.shared).last_params
    }

    pub fn last_frames(&self) -> Option<usize> {
        lock(&self.shared).last_frames
    }

    /// Simulate every playing source reaching the end of its buffer
    pub fn finish_all(&self) {
        let mut ledger = lock(&self.shared);
        let mut finished = Vec::new();
        for (id, status) in ledger.sources.iter_mut() {
            if *status == SourceStatus::Playing {
                *status = SourceStatus::Finished;
                finished.push(*id);
            }
        }
        for id in finished {
            ledger.record(PlaybackEvent::Finished(id));
        }
    }

    /// Make later source creation fail, as if the output device vanished
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.shared).unavailable = unavailable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lifecycle() {
        let mut sink = MemorySink::new();
        let probe = sink.probe();
        let buffer = Arc::new(AudioBuffer::silent(1, 10, 24000).unwrap());

        let mut source = sink.create_source(buffer, PlaybackParams::default()).unwrap();
        assert!(source.start().is_err());
        source.connect().unwrap();
        source.start().unwrap();
        assert_eq!(probe.active(), 1);
        assert!(!source.is_finished());

        source.stop();
        source.stop();
        assert_eq!(probe.active(), 0);
        assert_eq!(probe.stopped(), 1);
        assert!(source.is_finished());
        assert_eq!(probe.last_frames(), Some(10));
    }

    #[test]
    fn test_unavailable_toggle() {
        let mut sink = MemorySink::new();
        let probe = sink.probe();
        let buffer = Arc::new(AudioBuffer::silent(1, 10, 24000).unwrap());

        probe.set_unavailable(true);
        assert!(sink
            .create_source(buffer.clone(), PlaybackParams::default())
            .is_err());
        probe.set_unavailable(false);
        assert!(sink.create_source(buffer, PlaybackParams::default()).is_ok());
    }

    #[test]
    fn test_dropped_sources_leave_the_ledger() {
        let mut sink = MemorySink::new();
        let probe = sink.probe();
        let buffer = Arc::new(AudioBuffer::silent(1, 10, 24000).unwrap());

        for _ in 0..(EVENT_HISTORY * 2) {
            let mut source = sink
                .create_source(buffer.clone(), PlaybackParams::default())
                .unwrap();
            source.connect().unwrap();
            source.start().unwrap();
            source.stop();
        }

        assert_eq!(probe.live_sources(), 0);
        assert_eq!(probe.started(), EVENT_HISTORY * 2);
        assert_eq!(probe.events().len(), EVENT_HISTORY);
        assert_eq!(
            probe.events().last(),
            Some(&PlaybackEvent::Stopped(EVENT_HISTORY as u64 * 2 - 1))
        );
    }
}
