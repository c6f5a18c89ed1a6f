//! Application configuration and CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::voice::{AudioEncoding, VoiceConfig};
use crate::packer::parse_seconds;

/// Default Google Cloud Text-to-Speech endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// How recordings are played back after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    /// Decode the WAV and play it on the default output device
    #[default]
    Device,
    /// Hand the file to `ffplay` (any encoding FFmpeg understands)
    Ffplay,
}

impl std::fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerKind::Device => write!(f, "device"),
            PlayerKind::Ffplay => write!(f, "ffplay"),
        }
    }
}

/// Narrator application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "narrator")]
#[command(author, version, about = "Record narrated sentences and pack them into bounded audio files", long_about = None)]
pub struct AppConfig {
    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level operations.
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Interactively review, synthesize and re-record sentences
    Record(RecordConfig),
    /// Concatenate recordings into duration-bounded files with silence padding
    Pack(PackConfig),
}

/// Interactive recording session settings.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Source text to narrate
    #[arg(long, short = 't', env = "NARRATOR_TEXT", default_value = "texts/data.txt")]
    pub text: PathBuf,

    /// Directory holding one recording per sentence (001.wav, 002.wav, ...)
    #[arg(long, short = 'a', default_value = "texts/audio")]
    pub audio_dir: PathBuf,

    /// File remembering the last processed sentence
    #[arg(long, default_value = "settings.json")]
    pub settings: PathBuf,

    /// Google service-account JSON key
    #[arg(long, short = 'c', env = "NARRATOR_CREDENTIALS", default_value = "credentials-tts.json")]
    pub credentials: PathBuf,

    /// Target locale of the voice
    #[arg(long, default_value = "en-GB")]
    pub language_code: String,

    /// Synthesizer voice identifier
    #[arg(long, default_value = "en-GB-Chirp3-HD-Sadaltager")]
    pub voice_name: String,

    /// Speaking rate multiplier (0.25-4.0)
    #[arg(long, default_value = "0.9", value_parser = parse_speaking_rate)]
    pub speaking_rate: f32,

    /// Output encoding of the recordings
    #[arg(long, value_enum, default_value = "linear16")]
    pub audio_encoding: AudioEncoding,

    /// Playback method for fresh recordings
    #[arg(long, value_enum, default_value = "device")]
    pub player: PlayerKind,

    /// Text-to-Speech REST endpoint
    #[arg(long, env = "NARRATOR_TTS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// HTTP timeout for synthesis and token requests, in seconds
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Extra abbreviation that must not end a sentence (repeatable, e.g. --abbreviation Sec)
    #[arg(long = "abbreviation")]
    pub abbreviations: Vec<String>,
}

impl RecordConfig {
    /// Voice options for the synthesis gateway.
    pub fn voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            language_code: self.language_code.clone(),
            voice_name: self.voice_name.clone(),
            speaking_rate: self.speaking_rate,
            audio_encoding: self.audio_encoding,
        }
    }

    /// HTTP timeout for backend requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.text.exists() {
            anyhow::bail!(
                "Source text not found: {}. Create the folder and put the text to narrate in it.",
                self.text.display()
            );
        }

        if !self.credentials.exists() {
            anyhow::bail!(
                "Credential file not found: {}. Create a service-account JSON key with the Cloud Text-to-Speech User role.",
                self.credentials.display()
            );
        }

        if self.player == PlayerKind::Device && self.audio_encoding != AudioEncoding::Linear16 {
            anyhow::bail!("Device playback needs linear16 recordings; use --player ffplay for {}", self.audio_encoding);
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be positive");
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Source text: {}", self.text.display());
        info!("  Audio directory: {}", self.audio_dir.display());
        info!("  Settings file: {}", self.settings.display());
        info!("  Credentials: {}", self.credentials.display());
        info!("  Voice: {} ({})", self.voice_name, self.language_code);
        info!("  Speaking rate: {}", self.speaking_rate);
        info!("  Encoding: {}", self.audio_encoding);
        info!("  Player: {}", self.player);
        if !self.abbreviations.is_empty() {
            info!("  Extra abbreviations: {}", self.abbreviations.join(", "));
        }
    }
}

/// Packer settings.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Directory holding the recordings to pack
    #[arg(long, short = 'a', default_value = "texts/audio")]
    pub audio_dir: PathBuf,

    /// Directory receiving the merged files and their manifests
    #[arg(long, short = 'o', default_value = "texts/merged")]
    pub output_dir: PathBuf,

    /// Silence clip used as the padding unit
    #[arg(long, short = 's', default_value = "silence.wav")]
    pub silence: PathBuf,

    /// Maximum duration of one merged file, in seconds
    #[arg(long, short = 'm', default_value = "488", value_parser = parse_max_duration)]
    pub max_duration: Duration,

    /// Extension of the recordings (and of the merged files)
    #[arg(long, default_value = "wav")]
    pub extension: String,
}

impl PackConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.audio_dir.is_dir() {
            anyhow::bail!("Audio directory does not exist: {}", self.audio_dir.display());
        }

        if !self.silence.is_file() {
            anyhow::bail!("Silence file not found: {}", self.silence.display());
        }

        if self.output_dir.exists() && same_dir(&self.output_dir, &self.audio_dir) {
            anyhow::bail!("Output directory must differ from the audio directory: {}", self.output_dir.display());
        }

        if self.extension.trim_start_matches('.').is_empty() {
            anyhow::bail!("Extension must not be empty");
        }

        Ok(())
    }

    /// Extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Audio directory: {}", self.audio_dir.display());
        info!("  Output directory: {}", self.output_dir.display());
        info!("  Silence unit: {}", self.silence.display());
        info!("  Max duration: {:.3}s", self.max_duration.as_secs_f64());
        info!("  Extension: {}", self.extension());
    }
}

fn same_dir(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Parse and validate the speaking rate (0.25-4.0).
fn parse_speaking_rate(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a valid float", s))?;
    if (0.25..=4.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("speaking rate must be between 0.25 and 4.0, got {}", value))
    }
}

/// Parse a positive duration given in decimal seconds.
fn parse_max_duration(s: &str) -> Result<Duration, String> {
    let value = parse_seconds(s).ok_or_else(|| format!("'{}' is not a valid number of seconds", s))?;
    if value.is_zero() {
        Err("max duration must be positive".to_string())
    } else {
        Ok(value)
    }
}
