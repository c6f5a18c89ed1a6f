//! In-memory session state: the sentence list, the cursor and the current mode.

/// Externally visible session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The corpus is empty; only reload and quit do anything.
    Idle,
    Viewing(usize),
    Recording(usize),
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Recording,
    Exiting,
}

/// Sentences plus the index of the one being worked on.
#[derive(Debug, Clone)]
pub struct SessionState {
    sentences: Vec<String>,
    cursor: usize,
    phase: Phase,
}

impl SessionState {
    /// Start at `cursor`, clamped into the corpus.
    pub fn new(sentences: Vec<String>, cursor: usize) -> Self {
        let cursor = clamp_cursor(cursor, sentences.len());
        Self { sentences, cursor, phase: Phase::Active }
    }

    pub fn mode(&self) -> Mode {
        match self.phase {
            Phase::Exiting => Mode::Exiting,
            _ if self.sentences.is_empty() => Mode::Idle,
            Phase::Recording => Mode::Recording(self.cursor),
            Phase::Active => Mode::Viewing(self.cursor),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// The sentence under the cursor, if any.
    pub fn current(&self) -> Option<&str> {
        self.sentences.get(self.cursor).map(String::as_str)
    }

    /// Step back one sentence. Returns false at the first sentence.
    pub fn previous(&mut self) -> bool {
        if self.cursor == 0 || self.sentences.is_empty() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one sentence. Returns false at the last sentence.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 >= self.sentences.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Swap in a freshly segmented corpus, keeping the cursor where it still fits.
    pub fn replace_sentences(&mut self, sentences: Vec<String>) {
        self.cursor = clamp_cursor(self.cursor, sentences.len());
        self.sentences = sentences;
    }

    /// Enter `Recording` for the current sentence. Returns its index and text.
    pub fn begin_recording(&mut self) -> Option<(usize, String)> {
        let text = self.current()?.to_string();
        self.phase = Phase::Recording;
        Some((self.cursor, text))
    }

    /// Back to `Viewing` after a recording attempt, whatever its outcome.
    pub fn finish_recording(&mut self) {
        if self.phase == Phase::Recording {
            self.phase = Phase::Active;
        }
    }

    pub fn exit(&mut self) {
        self.phase = Phase::Exiting;
    }
}

/// Keep `cursor` if it is still a valid index into `count` sentences, else snap to the last one.
pub fn clamp_cursor(cursor: usize, count: usize) -> usize {
    cursor.min(count.saturating_sub(1))
}
