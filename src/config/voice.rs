//! Voice selection for the Google Cloud Text-to-Speech backend.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output container/codec requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AudioEncoding {
    /// 16-bit PCM in a WAV container
    #[default]
    Linear16,
    /// MPEG layer III
    Mp3,
    /// Opus in an Ogg container
    OggOpus,
}

impl AudioEncoding {
    /// Name used in the `audioConfig.audioEncoding` request field.
    pub fn api_name(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "LINEAR16",
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::OggOpus => "OGG_OPUS",
        }
    }

    /// File extension for recordings in this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "wav",
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::OggOpus => "ogg",
        }
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

/// Voice options sent with every synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub language_code: String,
    pub voice_name: String,
    pub speaking_rate: f32,
    pub audio_encoding: AudioEncoding,
}
