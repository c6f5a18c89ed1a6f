//! Error types shared by the recording session, the synthesis gateway and the packer.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for narrator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for narrator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input (source text, credential file, directories).
    #[error("input error: {0}")]
    Input(String),

    /// A file could not be read or written.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Credential could not be obtained, or the backend rejected it for good.
    #[error("authorization error: {0}")]
    Auth(String),

    /// The backend rejected the access token (HTTP 401); a refresh may fix it.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend rejected the request or returned no audio.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Playback tool or device missing or failing.
    #[error("playback error: {0}")]
    Playback(String),

    /// Unrecoverable packer failure.
    #[error("packing error: {0}")]
    Packing(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// WAV decoding error.
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an IO error with the path it happened on.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess { path: path.into(), source }
    }

    /// Returns true if this is an authorization error.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Unauthorized(_))
    }
}
