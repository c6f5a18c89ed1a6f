//! Operator commands and the keyboard that produces them.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::debug;

use crate::error::{Error, Result};

/// A single-key operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Previous,
    Next,
    Record,
    Reload,
    QuitSave,
    QuitDiscard,
}

/// Source of operator commands.
pub trait CommandSource {
    async fn next_command(&mut self) -> Result<Command>;
}

/// Reads single key presses from the terminal.
///
/// Raw mode is enabled only while waiting for a key, so log output and notices
/// printed between reads render normally. Keys typed while a command is running are
/// discarded.
#[derive(Debug, Default)]
pub struct Keyboard;

impl Keyboard {
    pub fn new() -> Self {
        Self
    }
}

impl CommandSource for Keyboard {
    async fn next_command(&mut self) -> Result<Command> {
        tokio::task::spawn_blocking(read_command)
            .await
            .map_err(|e| Error::Input(format!("keyboard reader stopped: {}", e)))?
    }
}

fn read_command() -> Result<Command> {
    terminal::enable_raw_mode()?;
    let command = wait_for_command();
    terminal::disable_raw_mode()?;
    command
}

fn wait_for_command() -> Result<Command> {
    // Drop whatever was typed while the previous command ran
    while event::poll(Duration::ZERO)? {
        event::read()?;
    }

    loop {
        if let Event::Key(key) = event::read()? {
            match map_key(&key) {
                Some(command) => {
                    debug!("Key {:?} -> {:?}", key.code, command);
                    return Ok(command);
                }
                None => debug!("Ignoring key {:?}", key.code),
            }
        }
    }
}

/// Translate a key press into a command; releases, repeats and unbound keys map to `None`.
pub fn map_key(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c' | 'C') if ctrl => Some(Command::QuitDiscard),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Left => Some(Command::Previous),
        KeyCode::Right => Some(Command::Next),
        KeyCode::Char(' ') => Some(Command::Record),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'j' => Some(Command::Previous),
            'l' => Some(Command::Next),
            'r' => Some(Command::Reload),
            'q' => Some(Command::QuitSave),
            _ => None,
        },
        _ => None,
    }
}
