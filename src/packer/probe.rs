//! Measuring the playing time of recordings.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::debug;

use crate::audio::wav_duration;
use crate::error::{Error, Result};

/// Reports the exact playing time of an audio file.
pub trait DurationProbe {
    fn measure(&self, path: &Path) -> Result<Duration>;
}

/// Reads WAV headers directly and asks `ffprobe` for everything else.
pub struct MediaProbe {
    ffprobe: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        let program = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
        Self::new(program)
    }
}

impl MediaProbe {
    pub fn new(ffprobe: impl Into<String>) -> Self {
        Self { ffprobe: ffprobe.into() }
    }

    fn run_ffprobe(&self, path: &Path) -> Result<Duration> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::Packing(format!("'{}' not found; install FFmpeg", self.ffprobe)),
                _ => Error::Packing(format!("cannot run '{}': {}", self.ffprobe, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Packing(format!("cannot measure {}: {}", path.display(), stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_seconds(stdout.trim())
            .ok_or_else(|| Error::Packing(format!("unreadable duration '{}' for {}", stdout.trim(), path.display())))
    }
}

impl DurationProbe for MediaProbe {
    fn measure(&self, path: &Path) -> Result<Duration> {
        let is_wav = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        let duration = if is_wav {
            wav_duration(path).map_err(|e| Error::Packing(format!("cannot measure {}: {}", path.display(), e)))?
        } else {
            self.run_ffprobe(path)?
        };
        debug!("{} lasts {:?}", path.display(), duration);
        Ok(duration)
    }
}

/// Parse a non-negative decimal number of seconds ("488", "12.5", ".25") into an exact
/// duration. Digits beyond nanosecond precision are truncated.
pub fn parse_seconds(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let secs = if whole.is_empty() { 0 } else { whole.parse::<u64>().ok()? };
    let nanos = fraction.bytes().chain(std::iter::repeat(b'0')).take(9).fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
    Some(Duration::new(secs, nanos))
}
