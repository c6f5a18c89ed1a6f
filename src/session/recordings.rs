//! Per-sentence recording files.

use std::path::PathBuf;

use tracing::info;

use crate::error::{Error, Result};

/// Maps sentence indices to `NNN.<ext>` files in one directory.
///
/// Whether a sentence is recorded is decided by the file being there, checked on
/// every call.
#[derive(Debug, Clone)]
pub struct RecordingCache {
    dir: PathBuf,
    extension: String,
}

impl RecordingCache {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { dir: dir.into(), extension: extension.into() }
    }

    /// File for the zero-based sentence `index` (0 -> `001.wav`).
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{:03}.{}", index + 1, self.extension))
    }

    pub fn exists(&self, index: usize) -> bool {
        self.path_for(index).is_file()
    }

    /// Write or overwrite the recording for `index`.
    ///
    /// The bytes go to a temporary file that is then renamed over the target, so a
    /// failed write never leaves a truncated recording behind.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn store(&self, index: usize, audio: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::file_access(&self.dir, e))?;

        let path = self.path_for(index);
        let tmp = self.dir.join(format!(".{:03}.{}.part", index + 1, self.extension));

        if let Err(e) = std::fs::write(&tmp, audio) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::file_access(&tmp, e));
        }
        std::fs::rename(&tmp, &path).map_err(|e| Error::file_access(&path, e))?;

        info!("💾 Saved {} ({} bytes)", path.display(), audio.len());
        Ok(path)
    }
}
