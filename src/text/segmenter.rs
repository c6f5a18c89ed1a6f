//! Heuristic sentence segmentation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// Terminal punctuation run, optional closing quotes/brackets, then whitespace or end of text.
static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"([.!?]+)["'”’)\]]*(?:\s+|$)"#).expect("boundary pattern is valid"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Words that are followed by a period without ending a sentence.
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "rev", "gen", "col", "capt", "lt", "sgt", "gov", "sen", "rep", "vs", "etc",
    "fig", "vol", "approx", "dept",
];

/// Abbreviations that only hold before a number, as in `No. 5`.
const NUMBER_ABBREVIATIONS: &[&str] = &["no", "nos"];

/// Splits free text into sentences.
///
/// Sentences end at `.`, `!` or `?` followed by whitespace or end of text. A lone `.`
/// after an abbreviation (a single letter, a dotted form such as `e.g`, or a word
/// from the abbreviation set) does not end a sentence. `No.` is kept only when a
/// number follows it.
#[derive(Debug, Clone)]
pub struct Segmenter {
    abbreviations: HashSet<String>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Segmenter {
    /// Create a segmenter with the default abbreviations plus `extra` (case-insensitive,
    /// trailing period optional).
    pub fn new(extra: &[String]) -> Self {
        let abbreviations = DEFAULT_ABBREVIATIONS
            .iter()
            .map(|a| a.to_string())
            .chain(extra.iter().map(|a| a.trim().trim_end_matches('.').to_lowercase()))
            .filter(|a| !a.is_empty())
            .collect();
        Self { abbreviations }
    }

    /// Split `text` into trimmed, whitespace-collapsed, non-empty sentences.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for caps in BOUNDARY.captures_iter(text) {
            let (Some(whole), Some(terminal)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            if terminal.as_str() == "." && self.follows_abbreviation(&text[start..terminal.start()], &text[whole.end()..]) {
                continue;
            }

            push_sentence(&mut sentences, &text[start..whole.end()]);
            start = whole.end();
        }

        push_sentence(&mut sentences, &text[start..]);
        sentences
    }

    /// Read `path` and segment its contents.
    pub fn read_sentences(&self, path: &Path) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_access(path, e))?;
        let sentences = self.segment(&content);
        debug!("Segmented {} into {} sentences", path.display(), sentences.len());
        Ok(sentences)
    }

    fn follows_abbreviation(&self, preceding: &str, following: &str) -> bool {
        let word = preceding.rsplit(char::is_whitespace).next().unwrap_or_default();
        let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());

        let mut chars = word.chars();
        match (chars.next(), chars.next()) {
            (None, _) => false,
            (Some(c), None) => c.is_alphabetic(),
            _ => {
                let word = word.to_lowercase();
                let before_number = following.starts_with(|c: char| c.is_ascii_digit());
                word.contains('.') || self.abbreviations.contains(&word) || (before_number && NUMBER_ABBREVIATIONS.contains(&word.as_str()))
            }
        }
    }
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    if !collapsed.is_empty() {
        sentences.push(collapsed.into_owned());
    }
}
