//! Concatenation manifests and the ffmpeg concat demuxer.

use std::fmt::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::plan::{Bin, Entry};
use crate::error::{Error, Result};

/// Joins the files listed in a manifest into one output file.
pub trait Concatenator {
    fn concat(&self, manifest: &Path, output: &Path) -> Result<()>;
}

/// Stream-copies the manifest entries with `ffmpeg -f concat`.
pub struct FfmpegConcat {
    ffmpeg: String,
}

impl Default for FfmpegConcat {
    fn default() -> Self {
        let program = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        Self::new(program)
    }
}

impl FfmpegConcat {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self { ffmpeg: ffmpeg.into() }
    }
}

impl Concatenator for FfmpegConcat {
    fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        debug!("Concatenating {} into {}", manifest.display(), output.display());

        let result = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::Packing(format!("'{}' not found; install FFmpeg", self.ffmpeg)),
                _ => Error::Packing(format!("cannot run '{}': {}", self.ffmpeg, e)),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Packing(format!("ffmpeg failed for {}: {}", output.display(), stderr.trim())));
        }
        Ok(())
    }
}

/// Render the concat-demuxer list for `bin`, one `file '<path>'` line per entry.
pub fn render_manifest(bin: &Bin, silence: &Path) -> String {
    let mut manifest = String::new();
    for entry in bin.entries() {
        let path = match entry {
            Entry::Silence => silence,
            Entry::Segment(path) => path,
        };
        let _ = writeln!(manifest, "file '{}'", quote(path));
    }
    manifest
}

/// Write the manifest for `bin` to `manifest`.
pub fn write_manifest(bin: &Bin, silence: &Path, manifest: &Path) -> Result<()> {
    std::fs::write(manifest, render_manifest(bin, silence)).map_err(|e| Error::file_access(manifest, e))
}

// Single quotes close the quoted string, get escaped, and reopen it.
fn quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::packer::plan::Segment;

    fn bin(paths: &[&str]) -> Bin {
        Bin {
            segments: paths.iter().map(|p| Segment { path: PathBuf::from(p), duration: Duration::from_secs(1) }).collect(),
        }
    }

    #[test]
    fn test_manifest_lists_padding_and_segments() {
        let manifest = render_manifest(&bin(&["/a/001.wav", "/a/002.wav"]), Path::new("/s/silence.wav"));
        let lines: Vec<&str> = manifest.lines().collect();

        assert_eq!(lines.len(), 5 + 1 + 2 + 1 + 3);
        assert!(lines[..5].iter().all(|l| *l == "file '/s/silence.wav'"));
        assert_eq!(lines[5], "file '/a/001.wav'");
        assert_eq!(lines[8], "file '/a/002.wav'");
        assert!(manifest.ends_with("file '/s/silence.wav'\n"));
    }

    #[test]
    fn test_single_quotes_are_escaped() {
        let manifest = render_manifest(&bin(&["/a/it's.wav"]), Path::new("/s/silence.wav"));
        assert!(manifest.contains(r"file '/a/it'\''s.wav'"));
    }

    #[test]
    fn test_missing_ffmpeg_is_packing_error() {
        let dir = tempfile::tempdir().unwrap();
        let concat = FfmpegConcat::new("narrator-test-no-such-ffmpeg");
        let err = concat.concat(&dir.path().join("001.txt"), &dir.path().join("001.wav")).unwrap_err();
        assert!(matches!(err, Error::Packing(ref m) if m.contains("not found")));
    }
}
