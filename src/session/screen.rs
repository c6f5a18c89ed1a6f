//! Terminal rendering of the current sentence.

use std::io::{Stdout, Write};
use std::path::PathBuf;

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

use crate::error::Result;

/// What the operator sees after each command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Sentence { text: &'a str, recorded: bool, notice: Option<&'a str> },
    Empty { notice: Option<&'a str> },
}

/// Output surface of the session.
pub trait Screen {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()>;

    /// Startup summary shown once before the first sentence.
    fn banner(&mut self, position: usize, total: usize) -> Result<()>;
}

pub const KEYS_HELP: &str = "Keys: J/\u{2190} prev | L/\u{2192} next | Space record | R reload | Q save & quit | Ctrl+C quit without saving";

/// Clears the terminal and prints the sentence, `* ` marking a recorded one.
pub struct TerminalScreen {
    out: Stdout,
    source: PathBuf,
}

impl TerminalScreen {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self { out: std::io::stdout(), source: source.into() }
    }
}

impl Screen for TerminalScreen {
    fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;

        let notice = match frame {
            Frame::Sentence { text, recorded, notice } => {
                let marker = if *recorded { "* " } else { "" };
                writeln!(self.out, "{}{}", marker, text)?;
                notice
            }
            Frame::Empty { notice } => {
                writeln!(self.out, "No sentences found in {}. Add text and press R to reload.", self.source.display())?;
                notice
            }
        };

        if let Some(notice) = notice {
            writeln!(self.out)?;
            writeln!(self.out, "{}", notice)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn banner(&mut self, position: usize, total: usize) -> Result<()> {
        let rule = "-".repeat(66);
        writeln!(self.out, "Starting at Sentence {} / {}", position, total)?;
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "{}", KEYS_HELP)?;
        writeln!(self.out, "{}", rule)?;
        self.out.flush()?;
        Ok(())
    }
}
