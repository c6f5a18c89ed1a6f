//! Session module for the interactive record-and-review loop.
//!
//! Holds the sentence list and cursor, persists the cursor between runs, maps key
//! presses to commands and keeps one recording file per sentence.

mod input;
mod recordings;
mod runner;
mod screen;
mod state;
mod store;

pub use input::Keyboard;
pub use recordings::RecordingCache;
pub use runner::{Corpus, Outcome, Session};
pub use screen::TerminalScreen;
pub use store::CursorStore;
