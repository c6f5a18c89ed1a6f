//! Packer module for merging per-sentence recordings into longer files.
//!
//! Recordings are measured, grouped in order into bins bounded by a maximum duration,
//! padded with a silence unit, and concatenated by ffmpeg.

mod concat;
mod plan;
mod probe;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

pub use concat::{Concatenator, FfmpegConcat};
pub use probe::{DurationProbe, MediaProbe, parse_seconds};

use concat::write_manifest;
use plan::{Bin, Segment, plan_bins};

use crate::config::PackConfig;
use crate::error::{Error, Result};

/// One merged file written by a packing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBin {
    pub number: usize,
    pub output: PathBuf,
    pub segments: usize,
    pub duration: Duration,
    pub oversized: bool,
}

/// Batch job turning a directory of recordings into bounded merges.
pub struct Packer<P: DurationProbe, C: Concatenator> {
    probe: P,
    concat: C,
}

impl Packer<MediaProbe, FfmpegConcat> {
    /// Packer backed by ffprobe and ffmpeg from PATH.
    pub fn with_ffmpeg() -> Self {
        Self::new(MediaProbe::default(), FfmpegConcat::default())
    }
}

impl<P: DurationProbe, C: Concatenator> Packer<P, C> {
    pub fn new(probe: P, concat: C) -> Self {
        Self { probe, concat }
    }

    /// Measure, plan and write all bins.
    ///
    /// Every input is measured before anything is written, so an unreadable recording
    /// aborts the run without output. Numbered outputs from earlier runs are removed.
    ///
    /// # Errors
    /// Returns an error if the silence unit or any recording cannot be measured, or if
    /// writing a manifest or concatenating a bin fails.
    pub fn run(&self, config: &PackConfig) -> Result<Vec<PackedBin>> {
        let extension = config.extension();
        let silence = config
            .silence
            .canonicalize()
            .map_err(|e| Error::Packing(format!("silence file {}: {}", config.silence.display(), e)))?;

        let unit = self.probe.measure(&silence)?;
        if unit.is_zero() {
            return Err(Error::Packing(format!("silence file {} has no duration", silence.display())));
        }
        debug!("Silence unit lasts {:?}", unit);

        let paths = list_recordings(&config.audio_dir, extension, &silence)?;
        if paths.is_empty() {
            warn!("No .{} recordings found in {}", extension, config.audio_dir.display());
            return Ok(Vec::new());
        }

        let segments = paths
            .into_iter()
            .map(|path| self.probe.measure(&path).map(|duration| Segment { path, duration }))
            .collect::<Result<Vec<_>>>()?;
        let total = segments.len();

        let bins = plan_bins(segments, unit, config.max_duration);
        info!("📦 Packing {} recordings into {} files", total, bins.len());

        std::fs::create_dir_all(&config.output_dir).map_err(|e| Error::file_access(&config.output_dir, e))?;
        remove_numbered_outputs(&config.output_dir, extension)?;

        match self.write_bins(&bins, unit, &silence, config) {
            Ok(packed) => Ok(packed),
            Err(e) => {
                // Leave no partial set behind
                if let Err(cleanup) = remove_numbered_outputs(&config.output_dir, extension) {
                    warn!("Cannot clean up after failed run: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    fn write_bins(&self, bins: &[Bin], unit: Duration, silence: &Path, config: &PackConfig) -> Result<Vec<PackedBin>> {
        let mut packed = Vec::with_capacity(bins.len());

        for (i, bin) in bins.iter().enumerate() {
            let number = i + 1;
            let manifest = config.output_dir.join(format!("{:03}.txt", number));
            let output = config.output_dir.join(format!("{:03}.{}", number, config.extension()));

            write_manifest(bin, silence, &manifest)?;
            self.concat.concat(&manifest, &output)?;

            let result = PackedBin {
                number,
                output,
                segments: bin.segments.len(),
                duration: bin.duration(unit),
                oversized: bin.is_oversized(unit, config.max_duration),
            };

            if result.oversized {
                warn!(
                    "⚠️  {} holds a single recording longer than the limit ({:.3}s > {:.3}s)",
                    result.output.display(),
                    result.duration.as_secs_f64(),
                    config.max_duration.as_secs_f64()
                );
            } else {
                info!("✅ {} ({} recordings, {:.3}s)", result.output.display(), result.segments, result.duration.as_secs_f64());
            }
            packed.push(result);
        }

        Ok(packed)
    }
}

/// Recordings with `extension` in `dir`, sorted by file name, as absolute paths.
fn list_recordings(dir: &Path, extension: &str, exclude: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::file_access(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::file_access(dir, e))?.path();
        let matches = path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }
        let path = path.canonicalize().map_err(|e| Error::file_access(&path, e))?;
        if path != exclude {
            paths.push(path);
        }
    }

    paths.sort_by_cached_key(|path| recording_order(path));
    Ok(paths)
}

/// Numbered recordings first, by number, then everything else by name.
fn recording_order(path: &Path) -> (bool, u64, Option<std::ffi::OsString>) {
    let number = path.file_stem().and_then(|stem| stem.to_str()).and_then(|stem| stem.parse::<u64>().ok());
    (number.is_none(), number.unwrap_or_default(), path.file_name().map(|name| name.to_os_string()))
}

/// Delete `NNN.<extension>` and `NNN.txt` files left by earlier runs.
fn remove_numbered_outputs(dir: &Path, extension: &str) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::file_access(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| Error::file_access(dir, e))?.path();
        if is_numbered_output(&path, extension) {
            debug!("Removing previous output {}", path.display());
            std::fs::remove_file(&path).map_err(|e| Error::file_access(&path, e))?;
        }
    }
    Ok(())
}

fn is_numbered_output(path: &Path, extension: &str) -> bool {
    let numbered = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.len() >= 3 && stem.bytes().all(|b| b.is_ascii_digit()));
    let known_ext = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension) || ext == "txt");
    numbered && known_ext && path.is_file()
}
