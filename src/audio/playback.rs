//! Playback of recorded sentences.
//!
//! Two players: the default output device through cpal (WAV only, resampled to the
//! device rate, fed through a lock-free ring buffer) and `ffplay` as a subprocess.
//! `QuietPlayback` reports the first failure of a session and swallows the rest.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, SupportedStreamConfig, SupportedStreamConfigRange};
use parking_lot::{Condvar, Mutex};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use tracing::{debug, info, warn};

use super::clip::Clip;
use crate::error::{Error, Result};

/// Size of the playback ring buffer in samples (~11 seconds at 48kHz)
const PLAYBACK_RING_SIZE: usize = 524288;

/// Plays one recording to completion.
pub trait Playback {
    fn play(&mut self, path: &Path) -> Result<()>;
}

impl<P: Playback + ?Sized> Playback for Box<P> {
    fn play(&mut self, path: &Path) -> Result<()> {
        (**self).play(path)
    }
}

/// Plays WAV recordings on the default output device.
///
/// The device is opened on first use so that a machine without audio output can
/// still synthesize recordings.
#[derive(Default)]
pub struct DevicePlayer {
    output: Option<DeviceOutput>,
}

impl DevicePlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Playback for DevicePlayer {
    fn play(&mut self, path: &Path) -> Result<()> {
        let clip = Clip::read_wav(path)?;
        let output = match &mut self.output {
            Some(output) => output,
            empty => empty.insert(DeviceOutput::open()?),
        };
        output.play(clip)
    }
}

/// An open output stream draining a ring buffer.
struct DeviceOutput {
    _stream: Stream,                      // Kept alive to maintain the audio stream
    sample_rate: u32,                     // Device sample rate
    producer: Mutex<ringbuf::HeapProd<f32>>,
    pending: Arc<AtomicUsize>,            // Samples queued but not yet played
    drained: Arc<(Mutex<()>, Condvar)>,   // Signalled when `pending` reaches zero
}

impl DeviceOutput {
    fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| Error::Playback("no output device available".to_string()))?;

        info!("Using output device: {}", device_name(&device));

        let sample_rate = match device.default_output_config() {
            Ok(default_config) => default_config.sample_rate(),
            Err(_) => {
                let configs = device.supported_output_configs().map_err(|e| Error::Playback(format!("cannot query output configs: {}", e)))?;
                find_best_config(configs, 48000)?.sample_rate()
            }
        };

        let configs = device.supported_output_configs().map_err(|e| Error::Playback(format!("cannot query output configs: {}", e)))?;
        let config = find_best_config(configs, sample_rate)?;
        let channels = config.channels() as usize;

        debug!("Audio playback config: {} Hz, {} channels, {:?}", sample_rate, channels, config.sample_format());

        let (producer, mut consumer) = HeapRb::<f32>::new(PLAYBACK_RING_SIZE).split();
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new((Mutex::new(()), Condvar::new()));

        let pending_cb = pending.clone();
        let drained_cb = drained.clone();

        let stream = device
            .build_output_stream(
                &config.config(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut played = 0;
                    for frame in data.chunks_mut(channels) {
                        let sample = match consumer.try_pop() {
                            Some(sample) => {
                                played += 1;
                                sample
                            }
                            None => 0.0,
                        };
                        frame.fill(sample);
                    }

                    if played > 0 && pending_cb.fetch_sub(played, Ordering::AcqRel) == played {
                        drained_cb.1.notify_all();
                    }
                },
                |err| tracing::error!("Audio playback error: {}", err),
                None,
            )
            .map_err(|e| Error::Playback(format!("cannot build output stream: {}", e)))?;

        stream.play().map_err(|e| Error::Playback(format!("cannot start output stream: {}", e)))?;

        Ok(Self { _stream: stream, sample_rate, producer: Mutex::new(producer), pending, drained })
    }

    /// Queue the whole clip and block until the device has played it.
    fn play(&self, clip: Clip) -> Result<()> {
        let clip = clip.resampled(self.sample_rate)?;
        let deadline = Instant::now() + clip.duration() + Duration::from_secs(1);
        let samples = clip.samples;

        debug!("Playing {} samples at {} Hz", samples.len(), self.sample_rate);

        let mut offset = 0;
        while offset < samples.len() {
            // Count before pushing so the callback never sees more played than pending
            let free = samples.len() - offset;
            self.pending.fetch_add(free, Ordering::AcqRel);
            let written = self.producer.lock().push_slice(&samples[offset..]);
            self.pending.fetch_sub(free - written, Ordering::AcqRel);
            offset += written;

            if written == 0 {
                std::thread::sleep(Duration::from_millis(10));
            }
        }

        let (lock, drained) = &*self.drained;
        let mut guard = lock.lock();
        while self.pending.load(Ordering::Acquire) > 0 {
            if Instant::now() > deadline {
                warn!("Playback timeout exceeded");
                return Err(Error::Playback("output device stopped consuming audio".to_string()));
            }
            drained.wait_for(&mut guard, Duration::from_millis(50));
        }

        debug!("Playback completed");
        Ok(())
    }
}

/// Get a human-readable device name.
fn device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Find an F32 mono/stereo configuration at (or closest to) `target_sample_rate`.
fn find_best_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_sample_rate: u32) -> Result<SupportedStreamConfig> {
    let candidates: Vec<SupportedStreamConfigRange> =
        configs.filter(|c| c.channels() <= 2 && c.sample_format() == SampleFormat::F32).collect();

    if let Some(config) = candidates.iter().find(|c| (c.min_sample_rate()..=c.max_sample_rate()).contains(&target_sample_rate)) {
        return Ok(config.clone().with_sample_rate(target_sample_rate));
    }

    let config = candidates.first().ok_or_else(|| Error::Playback("no F32 output configuration found".to_string()))?;
    let rate = if target_sample_rate < config.min_sample_rate() { config.min_sample_rate() } else { config.max_sample_rate() };
    Ok(config.clone().with_sample_rate(rate))
}

/// Plays recordings with an external command (`ffplay` by default).
pub struct CommandPlayer {
    program: String,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        let program = if cfg!(windows) { "ffplay.exe" } else { "ffplay" };
        Self::new(program)
    }
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Playback for CommandPlayer {
    fn play(&mut self, path: &Path) -> Result<()> {
        debug!("Running {} on {}", self.program, path.display());

        let status = Command::new(&self.program)
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::Playback(format!("'{}' not found; install FFmpeg and make sure it is on PATH", self.program))
                }
                _ => Error::Playback(format!("cannot run '{}': {}", self.program, e)),
            })?;

        if !status.success() {
            return Err(Error::Playback(format!("'{}' failed with {}", self.program, status)));
        }
        Ok(())
    }
}

/// Reports the first playback failure, then stays quiet until `reset`.
pub struct QuietPlayback<P> {
    inner: P,
    reported: bool,
}

impl<P: Playback> QuietPlayback<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, reported: false }
    }

    /// Play `path`; returns a message for the operator only for the first failure.
    pub fn play(&mut self, path: &Path) -> Option<String> {
        match self.inner.play(path) {
            Ok(()) => None,
            Err(e) if self.reported => {
                debug!("Suppressed repeated playback failure: {}", e);
                None
            }
            Err(e) => {
                warn!("🔇 {}", e);
                self.reported = true;
                Some(e.to_string())
            }
        }
    }

    /// Allow the next failure to be reported again.
    pub fn reset(&mut self) {
        self.reported = false;
    }

    #[cfg(test)]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}
