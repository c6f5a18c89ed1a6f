//! Decoded audio clips and exact WAV durations.

use std::path::Path;
use std::time::Duration;

use audioadapter_buffers::direct::InterleavedSlice;
use hound::{SampleFormat, WavReader};
use rubato::{Fft, FixedSync, Resampler};

use crate::error::{Error, Result};

/// Chunk size for FFT-based resampling (provides good quality and performance).
const CHUNK_SIZE: usize = 1024;

/// Number of sub-chunks for FFT processing (higher = better quality but more CPU).
const SUB_CHUNKS: usize = 2;

/// Mono f32 samples at a known sample rate.
#[derive(Debug, Clone)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Clip {
    /// Decode a WAV file, mixing all channels down to mono.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a WAV file.
    pub fn read_wav(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            SampleFormat::Int => {
                let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader.samples::<i32>().map(|s| s.map(|v| v as f32 / scale)).collect::<std::result::Result<_, _>>()?
            }
        };

        Ok(Self { samples: mix_to_mono(&interleaved, spec.channels as usize), sample_rate: spec.sample_rate })
    }

    /// Playing time of the clip.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.samples.len() as u64, self.sample_rate)
    }

    /// Convert the clip to `to_rate` using the FFT resampler.
    ///
    /// # Errors
    /// Returns an error if the resampler rejects the rates.
    pub fn resampled(self, to_rate: u32) -> Result<Self> {
        if self.sample_rate == to_rate || self.samples.is_empty() {
            return Ok(Self { sample_rate: to_rate, ..self });
        }

        let mut resampler = Fft::<f32>::new(self.sample_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input)
            .map_err(|e| Error::Playback(format!("cannot create resampler: {}", e)))?;

        // Whole-clip processing trims the resampler delay and flushes the tail
        let input_len = self.samples.len();
        let mut output = vec![0.0f32; resampler.process_all_needed_output_len(input_len)];
        let written = {
            let output_len = output.len();
            let input_adapter = InterleavedSlice::new(&self.samples, 1, input_len).map_err(|e| Error::Playback(format!("resampler input: {}", e)))?;
            let mut output_adapter =
                InterleavedSlice::new_mut(&mut output, 1, output_len).map_err(|e| Error::Playback(format!("resampler output: {}", e)))?;

            let (_, written) = resampler
                .process_all_into_buffer(&input_adapter, &mut output_adapter, input_len, None)
                .map_err(|e| Error::Playback(format!("resampling failed: {}", e)))?;
            written
        };

        output.truncate(written);
        Ok(Self { samples: output, sample_rate: to_rate })
    }
}

/// Duration of a WAV file, read from its header only.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a WAV file.
pub fn wav_duration(path: &Path) -> Result<Duration> {
    let reader = WavReader::open(path)?;
    Ok(frames_to_duration(reader.duration() as u64, reader.spec().sample_rate))
}

/// Exact playing time of `frames` frames at `sample_rate`, truncated to whole nanoseconds.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = frames as u128 * 1_000_000_000 / sample_rate as u128;
    Duration::from_nanos(nanos as u64)
}

/// Average interleaved channels into one.
fn mix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        data.to_vec()
    } else {
        data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = WavSpec { channels, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for _ in 0..frames {
            for c in 0..channels {
                writer.write_sample(if c == 0 { 16384i16 } else { 0 }).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_stereo_wav_is_mixed_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.wav");
        write_wav(&path, 2, 24000, 2400);

        let clip = Clip::read_wav(&path).unwrap();
        assert_eq!(clip.sample_rate, 24000);
        assert_eq!(clip.samples.len(), 2400);
        assert!((clip.samples[0] - 0.25).abs() < 1e-6); // (0.5 + 0.0) / 2
        assert_eq!(clip.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_wav_duration_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 1, 44100, 8820);
        assert_eq!(wav_duration(&path).unwrap(), Duration::from_millis(200));
    }

    #[test]
    fn test_non_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.mp3");
        std::fs::write(&path, b"ID3 not a wav").unwrap();
        assert!(matches!(Clip::read_wav(&path), Err(Error::Wav(_))));
    }

    #[test]
    fn test_frames_to_duration_is_exact() {
        assert_eq!(frames_to_duration(48000, 48000), Duration::from_secs(1));
        assert_eq!(frames_to_duration(1, 3), Duration::from_nanos(333_333_333));
        assert_eq!(frames_to_duration(10, 0), Duration::ZERO);
    }

    #[test]
    fn test_resample_upsampling() {
        let clip = Clip { samples: vec![0.0; 16000], sample_rate: 16000 };
        let result = clip.resampled(48000).unwrap();
        assert_eq!(result.sample_rate, 48000);
        assert!(result.samples.len() >= 47900 && result.samples.len() <= 48000, "got {}", result.samples.len());
    }

    #[test]
    fn test_resample_keeps_step_in_place() {
        // Silence for the first half second, then a constant level
        let mut samples = vec![0.0f32; 8000];
        samples.extend(std::iter::repeat_n(0.5f32, 8000));
        let result = Clip { samples, sample_rate: 16000 }.resampled(48000).unwrap();

        assert_eq!(result.samples.len(), 48000);
        assert!(result.samples[24000 - 200].abs() < 0.1, "early: {}", result.samples[24000 - 200]);
        assert!((result.samples[24000 + 200] - 0.5).abs() < 0.1, "late: {}", result.samples[24000 + 200]);
        assert!((result.samples[36000] - 0.5).abs() < 0.1, "level: {}", result.samples[36000]);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let clip = Clip { samples: vec![0.5; 10], sample_rate: 24000 };
        assert_eq!(clip.resampled(24000).unwrap().samples, vec![0.5; 10]);
    }
}
