//! Configuration module for the narrator.
//!
//! Provides CLI argument parsing, validation and voice settings.

#[allow(clippy::module_inception)]
mod config;
mod voice;

pub use config::{AppConfig, Command, PackConfig, PlayerKind, RecordConfig};
pub use voice::{AudioEncoding, VoiceConfig};
