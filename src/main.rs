//! Narrator - record a text sentence by sentence with Google Cloud Text-to-Speech.
//!
//! `narrator record` walks the sentences of a text file, synthesizing and replaying
//! one recording per sentence on demand. `narrator pack` merges the recordings into
//! silence-padded files that each stay under a maximum duration.

mod audio;
mod config;
mod error;
mod packer;
mod session;
mod text;
mod tts;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::{CommandPlayer, DevicePlayer, Playback};
use config::{AppConfig, Command, PackConfig, PlayerKind, RecordConfig};
use packer::Packer;
use session::{Corpus, CursorStore, Keyboard, Outcome, RecordingCache, Session, TerminalScreen};
use text::Segmenter;
use tts::{Gateway, GoogleTts, ServiceAccount, ServiceAccountKey};

/// Exit status after Ctrl+C, as a shell reports SIGINT.
const INTERRUPTED: i32 = 130;

/// Run the interactive recording session.
async fn record(config: RecordConfig) -> Result<()> {
    config.log_config();

    let key = ServiceAccountKey::from_file(&config.credentials).context("Cannot load service account key")?;
    let tokens = ServiceAccount::new(key, config.request_timeout())?;
    let backend = GoogleTts::new(&config.endpoint, config.request_timeout())?;
    let mut gateway = Gateway::new(tokens, backend, config.voice_config());
    gateway.authorize().await.context("Cannot obtain an access token")?;

    let player: Box<dyn Playback> = match config.player {
        PlayerKind::Device => Box::new(DevicePlayer::new()),
        PlayerKind::Ffplay => Box::new(CommandPlayer::default()),
    };

    let corpus = Corpus::new(&config.text, Segmenter::new(&config.abbreviations));
    let store = CursorStore::open(&config.settings);
    let recordings = RecordingCache::new(&config.audio_dir, config.audio_encoding.extension());
    let screen = TerminalScreen::new(&config.text);

    let mut session = Session::open(corpus, store, recordings, gateway, player, screen)?;
    session.banner()?;
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    let mut keyboard = Keyboard::new();
    let outcome = tokio::select! {
        outcome = session.run(&mut keyboard) => outcome,
        _ = signal::ctrl_c() => Ok(Outcome::Discarded),
    };

    // The keyboard may still hold the terminal in raw mode
    let _ = crossterm::terminal::disable_raw_mode();

    match outcome? {
        Outcome::Saved => {
            info!("✅ Position saved");
            Ok(())
        }
        Outcome::Discarded => {
            println!("\nExited without saving.");
            // A blocked key read would otherwise hold up runtime shutdown
            std::process::exit(INTERRUPTED);
        }
    }
}

/// Pack recordings into bounded files.
fn pack(config: PackConfig) -> Result<()> {
    config.log_config();

    let packed = Packer::with_ffmpeg().run(&config)?;
    let oversized = packed.iter().filter(|p| p.oversized).count();

    info!("✅ Wrote {} files to {}", packed.len(), config.output_dir.display());
    if oversized > 0 {
        info!("{} of them exceed the limit because a single recording is too long", oversized);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();

    // The recording screen owns stdout, so only warnings reach the terminal by default.
    // RUST_LOG wins over both defaults.
    let default_level = match (&config.command, config.verbose) {
        (_, true) => "debug",
        (Command::Record(_), false) => "warn",
        (Command::Pack(_), false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🎙️  Narrator v{}", env!("CARGO_PKG_VERSION"));

    let validation = match &config.command {
        Command::Record(record) => record.validate(),
        Command::Pack(pack) => pack.validate(),
    };
    if let Err(e) = validation {
        error!("❌ Configuration error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = match config.command {
        Command::Record(record_config) => record(record_config).await,
        Command::Pack(pack_config) => pack(pack_config),
    };

    if let Err(e) = result {
        error!("❌ {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
