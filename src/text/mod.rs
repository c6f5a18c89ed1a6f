//! Source text handling.
//!
//! Splits the narration text into the ordered sentences the session walks through.

mod segmenter;

pub use segmenter::Segmenter;
