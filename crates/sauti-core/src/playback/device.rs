//! System output device sink using cpal
//!
//! cpal streams are not `Send` on every platform, so the device and its
//! streams live on a dedicated audio thread. Sources talk to it over a
//! channel; stopping flips a shared flag the stream callback checks, so the
//! source is silent by the time `stop` returns.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{render, AudioSink, PlaybackParams, PlaybackSource};
use crate::audio::AudioBuffer;
use crate::error::{Error, Result};

/// Playback position and flags shared with the stream callback
struct StreamShared {
    samples: Vec<f32>,
    position: AtomicUsize,
    stopped: AtomicBool,
    finished: AtomicBool,
}

enum Command {
    Connect {
        id: u64,
        shared: Arc<StreamShared>,
        reply: mpsc::Sender<Result<()>>,
    },
    Start {
        id: u64,
        reply: mpsc::Sender<Result<()>>,
    },
    Close {
        id: u64,
    },
    Shutdown,
}

/// Sink bound to the default output device
pub struct DeviceSink {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
    native_rate: u32,
    native_channels: u16,
    next_id: u64,
}

impl DeviceSink {
    /// Open the default output device on a dedicated audio thread
    pub fn open() -> Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("sauti-audio".to_string())
            .spawn(move || audio_thread(inbox, ready_tx))?;

        let (native_rate, native_channels) = ready_rx
            .recv()
            .map_err(|_| Error::Playback("audio thread exited during startup".to_string()))??;

        info!(
            "Opened output device at {} Hz, {} channels",
            native_rate, native_channels
        );

        Ok(Self {
            commands,
            worker: Some(worker),
            native_rate,
            native_channels,
            next_id: 0,
        })
    }

    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    pub fn native_channels(&self) -> u16 {
        self.native_channels
    }
}

impl AudioSink for DeviceSink {
    type Source = DeviceSource;

    fn create_source(
        &mut self,
        buffer: Arc<AudioBuffer>,
        params: PlaybackParams,
    ) -> Result<DeviceSource> {
        if self.worker.is_none() {
            return Err(Error::Playback("output device has been released".to_string()));
        }

        let rendered = render(&buffer, params, self.native_rate)?;
        let samples = layout_for_device(&rendered, self.native_channels as usize);

        let id = self.next_id;
        self.next_id += 1;

        Ok(DeviceSource {
            id,
            commands: self.commands.clone(),
            shared: Arc::new(StreamShared {
                samples,
                position: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
                finished: AtomicBool::new(false),
            }),
            connected: false,
        })
    }

    fn release(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // The thread may already be gone if the device failed
        let _ = self.commands.send(Command::Shutdown);
        worker
            .join()
            .map_err(|_| Error::Playback("audio thread panicked".to_string()))?;
        info!("Released output device");
        Ok(())
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release output device: {}", e);
        }
    }
}

/// One playback of a rendered buffer on the output device
pub struct DeviceSource {
    id: u64,
    commands: mpsc::Sender<Command>,
    shared: Arc<StreamShared>,
    connected: bool,
}

impl DeviceSource {
    fn request(&self, build: impl FnOnce(mpsc::Sender<Result<()>>) -> Command) -> Result<()> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| Error::Playback("output device is not running".to_string()))?;
        response
            .recv()
            .map_err(|_| Error::Playback("output device stopped responding".to_string()))?
    }
}

impl PlaybackSource for DeviceSource {
    fn connect(&mut self) -> Result<()> {
        let id = self.id;
        let shared = self.shared.clone();
        self.request(|reply| Command::Connect { id, shared, reply })?;
        self.connected = true;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::Playback("source is not connected".to_string()));
        }
        let id = self.id;
        self.request(|reply| Command::Start { id, reply })
    }

    fn stop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.finished.store(true, Ordering::SeqCst);
        if self.connected {
            let _ = self.commands.send(Command::Close { id: self.id });
            self.connected = false;
        }
    }

    fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn audio_thread(inbox: mpsc::Receiver<Command>, ready: mpsc::Sender<Result<(u32, u16)>>) {
    let (device, supported) = match open_default_output() {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.clone().into();
    let _ = ready.send(Ok((supported.sample_rate().0, supported.channels())));

    let mut streams: HashMap<u64, Stream> = HashMap::new();

    while let Ok(command) = inbox.recv() {
        match command {
            Command::Connect { id, shared, reply } => {
                let result = build_stream(&device, &config, sample_format, shared).map(|stream| {
                    streams.insert(id, stream);
                });
                let _ = reply.send(result);
            }
            Command::Start { id, reply } => {
                let result = match streams.get(&id) {
                    Some(stream) => stream
                        .play()
                        .map_err(|e| Error::Playback(format!("failed to start stream: {}", e))),
                    None => Err(Error::Playback(format!("no stream for source {}", id))),
                };
                let _ = reply.send(result);
            }
            Command::Close { id } => {
                if streams.remove(&id).is_some() {
                    debug!("Closed stream for source {}", id);
                }
            }
            Command::Shutdown => break,
        }
    }

    streams.clear();
    debug!("Audio thread exiting");
}

fn open_default_output() -> Result<(cpal::Device, SupportedStreamConfig)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::Playback(format!("failed to get default output config: {}", e)))?;
    Ok((device, supported))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    shared: Arc<StreamShared>,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(device, config, shared),
        SampleFormat::I16 => build_typed_stream::<i16>(device, config, shared),
        SampleFormat::U16 => build_typed_stream::<u16>(device, config, shared),
        format => Err(Error::Playback(format!(
            "unsupported sample format: {:?}",
            format
        ))),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<StreamShared>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let silence = T::from_sample(0.0f32);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if shared.stopped.load(Ordering::SeqCst) {
                    data.fill(silence);
                    return;
                }

                let pos = shared.position.load(Ordering::SeqCst);
                let remaining = shared.samples.len().saturating_sub(pos);
                if remaining == 0 {
                    data.fill(silence);
                    shared.finished.store(true, Ordering::SeqCst);
                    return;
                }

                let to_copy = remaining.min(data.len());
                for (slot, &sample) in data.iter_mut().zip(&shared.samples[pos..pos + to_copy]) {
                    *slot = T::from_sample(sample);
                }
                if to_copy < data.len() {
                    data[to_copy..].fill(silence);
                }
                shared.position.store(pos + to_copy, Ordering::SeqCst);
            },
            move |err| {
                error!(error = ?err, "playback stream error");
            },
            None,
        )
        .map_err(|e| Error::Playback(format!("failed to build output stream: {}", e)))
}

/// Interleave a rendered buffer for a device with `device_channels` channels.
///
/// Matching layouts interleave directly; anything else is mixed to mono and
/// duplicated across every device channel.
fn layout_for_device(buffer: &AudioBuffer, device_channels: usize) -> Vec<f32> {
    let planes = buffer.planes();
    if planes.len() == device_channels {
        return buffer.interleaved();
    }

    let scale = 1.0 / planes.len() as f32;
    let mut output = Vec::with_capacity(buffer.frames() * device_channels);
    for frame in 0..buffer.frames() {
        let mixed: f32 = planes.iter().map(|plane| plane[frame]).sum::<f32>() * scale;
        output.extend(std::iter::repeat(mixed).take(device_channels));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_expands_to_stereo() {
        let buffer = AudioBuffer::from_channels(vec![vec![0.1, 0.2]], 24000).unwrap();
        assert_eq!(layout_for_device(&buffer, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_stereo_mixes_to_mono() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![0.2, 0.4], vec![0.4, 0.0]], 24000).unwrap();
        let out = layout_for_device(&buffer, 1);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.2).abs() < 1e-6);
    }
}
