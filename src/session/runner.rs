//! The interactive recording loop.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::input::{Command, CommandSource};
use super::recordings::RecordingCache;
use super::screen::{Frame, Screen};
use super::state::{Mode, SessionState};
use super::store::CursorStore;
use crate::audio::{Playback, QuietPlayback};
use crate::error::Result;
use crate::text::Segmenter;
use crate::tts::Synthesize;

/// The source text file and how to split it.
pub struct Corpus {
    source: PathBuf,
    segmenter: Segmenter,
}

impl Corpus {
    pub fn new(source: impl Into<PathBuf>, segmenter: Segmenter) -> Self {
        Self { source: source.into(), segmenter }
    }

    /// Read and segment the source file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn load(&self) -> Result<Vec<String>> {
        self.segmenter.read_sentences(&self.source)
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    Discarded,
}

/// One interactive session over a corpus.
///
/// Commands are handled one at a time; a failing command leaves a notice under the
/// current sentence and the loop carries on.
pub struct Session<G, P, S> {
    corpus: Corpus,
    state: SessionState,
    store: CursorStore,
    recordings: RecordingCache,
    gateway: G,
    player: QuietPlayback<P>,
    screen: S,
    notice: Option<String>,
    outcome: Outcome,
}

impl<G: Synthesize, P: Playback, S: Screen> Session<G, P, S> {
    /// Load the corpus and restore the saved cursor, clamping and re-saving it if the
    /// corpus has shrunk since the last run.
    ///
    /// # Errors
    /// Returns an error if the source text cannot be read or the clamped cursor cannot be saved.
    pub fn open(corpus: Corpus, mut store: CursorStore, recordings: RecordingCache, gateway: G, player: P, screen: S) -> Result<Self> {
        let sentences = corpus.load()?;
        let stored = store.cursor();
        let state = SessionState::new(sentences, stored);

        if state.cursor() != stored {
            warn!("Saved position {} is past the end of the text, starting at {}", stored + 1, state.cursor() + 1);
            store.save(state.cursor())?;
        }
        info!("📖 Loaded {} sentences, starting at {}", state.len(), state.cursor() + 1);

        Ok(Self {
            corpus,
            state,
            store,
            recordings,
            gateway,
            player: QuietPlayback::new(player),
            screen,
            notice: None,
            outcome: Outcome::Saved,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Print the startup summary (nothing for an empty corpus).
    pub fn banner(&mut self) -> Result<()> {
        if self.state.is_empty() {
            return Ok(());
        }
        self.screen.banner(self.state.cursor() + 1, self.state.len())
    }

    /// Read and handle commands until the operator quits.
    ///
    /// # Errors
    /// Returns an error only if the command source or the screen fails.
    pub async fn run<C: CommandSource>(&mut self, input: &mut C) -> Result<Outcome> {
        self.render()?;
        loop {
            let command = input.next_command().await?;
            self.handle(command).await;

            if self.state.mode() == Mode::Exiting {
                return Ok(self.outcome);
            }
            self.render()?;
        }
    }

    /// Apply one command. Failures become a notice instead of ending the session.
    pub async fn handle(&mut self, command: Command) {
        debug!("Handling {:?} in {:?}", command, self.state.mode());

        let result = match command {
            Command::Previous | Command::Next | Command::Record if self.state.is_empty() => {
                self.notice = Some("Nothing to process. Add text and press R to reload.".to_string());
                Ok(())
            }
            Command::Previous => {
                self.state.previous();
                Ok(())
            }
            Command::Next => self.next(),
            Command::Record => self.record().await,
            Command::Reload => self.reload(),
            Command::QuitSave => self.quit_save(),
            Command::QuitDiscard => {
                info!("Quitting without saving");
                self.outcome = Outcome::Discarded;
                self.state.exit();
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("{:?} failed: {}", command, e);
            self.notice = Some(format!("Error: {}", e));
        }
    }

    fn next(&mut self) -> Result<()> {
        if self.state.next() {
            self.store.save(self.state.cursor())?;
        }
        Ok(())
    }

    async fn record(&mut self) -> Result<()> {
        let Some((index, text)) = self.state.begin_recording() else {
            return Ok(());
        };

        self.notice = Some(format!("Synthesizing sentence {} / {}...", index + 1, self.state.len()));
        if let Err(e) = self.render() {
            debug!("Cannot show progress: {}", e);
        }

        let stored = match self.gateway.synthesize(&text).await {
            Ok(audio) => self.recordings.store(index, &audio),
            Err(e) => Err(e),
        };
        self.state.finish_recording();

        let path = match stored {
            Ok(path) => path,
            Err(e) => {
                warn!("Recording sentence {} failed: {}", index + 1, e);
                self.notice = Some(format!("Error: sentence {}: {}", index + 1, e));
                return Ok(());
            }
        };

        if let Some(message) = self.player.play(&path) {
            self.notice = Some(message);
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        let sentences = self.corpus.load()?;
        self.state.replace_sentences(sentences);
        self.player.reset();

        info!("🔄 Reloaded {} sentences", self.state.len());
        if !self.state.is_empty() {
            self.notice = Some(format!("Sentence {} / {}", self.state.cursor() + 1, self.state.len()));
        }
        Ok(())
    }

    fn quit_save(&mut self) -> Result<()> {
        self.store.save(self.state.cursor())?;
        info!("Saved position {} to {}", self.state.cursor() + 1, self.store.path().display());
        self.outcome = Outcome::Saved;
        self.state.exit();
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let notice = self.notice.take();
        let frame = match self.state.current() {
            Some(text) => Frame::Sentence { text, recorded: self.recordings.exists(self.state.cursor()), notice: notice.as_deref() },
            None => Frame::Empty { notice: notice.as_deref() },
        };
        self.screen.render(&frame)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct FakeGateway {
        replies: VecDeque<Result<Vec<u8>>>,
        requests: Vec<String>,
    }

    impl Synthesize for FakeGateway {
        async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>> {
            self.requests.push(text.to_string());
            self.replies.pop_front().unwrap_or_else(|| Ok(b"audio".to_vec()))
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        played: Vec<PathBuf>,
        fail: bool,
    }

    impl Playback for FakePlayer {
        fn play(&mut self, path: &Path) -> Result<()> {
            self.played.push(path.to_path_buf());
            if self.fail { Err(Error::Playback("ffplay not found".to_string())) } else { Ok(()) }
        }
    }

    /// Keeps each rendered frame as text.
    #[derive(Default)]
    struct FakeScreen {
        frames: Vec<String>,
    }

    impl Screen for FakeScreen {
        fn render(&mut self, frame: &Frame<'_>) -> Result<()> {
            let text = match frame {
                Frame::Sentence { text, recorded, notice } => {
                    format!("{}{}|{}", if *recorded { "* " } else { "" }, text, notice.unwrap_or(""))
                }
                Frame::Empty { notice } => format!("<empty>|{}", notice.unwrap_or("")),
            };
            self.frames.push(text);
            Ok(())
        }

        fn banner(&mut self, position: usize, total: usize) -> Result<()> {
            self.frames.push(format!("banner {position}/{total}"));
            Ok(())
        }
    }

    struct Script(VecDeque<Command>);

    impl CommandSource for Script {
        async fn next_command(&mut self) -> Result<Command> {
            self.0.pop_front().ok_or_else(|| Error::Input("script exhausted".to_string()))
        }
    }

    fn script(commands: &[Command]) -> Script {
        Script(commands.iter().copied().collect())
    }

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(text: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("data.txt"), text).unwrap();
            Self { dir }
        }

        fn settings(&self) -> PathBuf {
            self.dir.path().join("settings.json")
        }

        fn audio(&self) -> PathBuf {
            self.dir.path().join("audio")
        }

        fn saved_cursor(&self) -> usize {
            CursorStore::open(self.settings()).cursor()
        }

        fn session(&self, gateway: FakeGateway, player: FakePlayer) -> Session<FakeGateway, FakePlayer, FakeScreen> {
            let corpus = Corpus::new(self.dir.path().join("data.txt"), Segmenter::default());
            let store = CursorStore::open(self.settings());
            let recordings = RecordingCache::new(self.audio(), "wav");
            Session::open(corpus, store, recordings, gateway, player, FakeScreen::default()).unwrap()
        }
    }

    const FIVE: &str = "One. Two. Three. Four. Five.";

    #[tokio::test]
    async fn test_next_persists_previous_does_not() {
        let fx = Fixture::new(FIVE);
        CursorStore::open(fx.settings()).save(2).unwrap();
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        session.handle(Command::Next).await;
        assert_eq!(session.state().mode(), Mode::Viewing(3));
        assert_eq!(fx.saved_cursor(), 3);

        session.handle(Command::Previous).await;
        assert_eq!(session.state().mode(), Mode::Viewing(2));
        assert_eq!(fx.saved_cursor(), 3);
    }

    #[tokio::test]
    async fn test_startup_clamps_and_saves_cursor() {
        let fx = Fixture::new("Only. Two.");
        CursorStore::open(fx.settings()).save(9).unwrap();

        let session = fx.session(FakeGateway::default(), FakePlayer::default());
        assert_eq!(session.state().cursor(), 1);
        assert_eq!(fx.saved_cursor(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::new(dir.path().join("missing.txt"), Segmenter::default());
        let result = Session::open(
            corpus,
            CursorStore::open(dir.path().join("settings.json")),
            RecordingCache::new(dir.path(), "wav"),
            FakeGateway::default(),
            FakePlayer::default(),
            FakeScreen::default(),
        );
        assert!(matches!(result, Err(Error::FileAccess { .. })));
    }

    #[tokio::test]
    async fn test_record_stores_and_plays() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        session.handle(Command::Next).await;
        session.handle(Command::Record).await;

        let path = fx.audio().join("002.wav");
        assert_eq!(fs::read(&path).unwrap(), b"audio");
        assert_eq!(session.gateway.requests, vec!["Two."]);
        assert_eq!(session.player.inner().played, vec![path]);
        assert_eq!(session.state().mode(), Mode::Viewing(1));

        session.render().unwrap();
        assert!(session.screen.frames.last().unwrap().starts_with("* Two."));
    }

    #[tokio::test]
    async fn test_rerecord_overwrites() {
        let fx = Fixture::new(FIVE);
        let gateway = FakeGateway { replies: VecDeque::from([Ok(b"take one".to_vec()), Ok(b"take two".to_vec())]), ..Default::default() };
        let mut session = fx.session(gateway, FakePlayer::default());

        session.handle(Command::Record).await;
        session.handle(Command::Record).await;

        let files: Vec<_> = fs::read_dir(fx.audio()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read(fx.audio().join("001.wav")).unwrap(), b"take two");
    }

    #[tokio::test]
    async fn test_failed_synthesis_keeps_previous_recording() {
        let fx = Fixture::new(FIVE);
        let gateway = FakeGateway {
            replies: VecDeque::from([Ok(b"good".to_vec()), Err(Error::Synthesis("no audio content".to_string()))]),
            ..Default::default()
        };
        let mut session = fx.session(gateway, FakePlayer::default());

        session.handle(Command::Record).await;
        session.handle(Command::Record).await;

        assert_eq!(session.state().mode(), Mode::Viewing(0));
        assert_eq!(fs::read(fx.audio().join("001.wav")).unwrap(), b"good");
        assert_eq!(session.player.inner().played.len(), 1);

        session.render().unwrap();
        let frame = session.screen.frames.last().unwrap();
        assert!(frame.starts_with("* One.|Error: sentence 1: synthesis error"), "{frame}");
    }

    #[tokio::test]
    async fn test_failed_synthesis_names_the_sentence() {
        let fx = Fixture::new(FIVE);
        let gateway = FakeGateway { replies: VecDeque::from([Err(Error::Synthesis("no audio content".to_string()))]), ..Default::default() };
        let mut session = fx.session(gateway, FakePlayer::default());

        session.handle(Command::Next).await;
        session.handle(Command::Next).await;
        session.handle(Command::Record).await;

        assert_eq!(session.state().mode(), Mode::Viewing(2));
        assert!(!fx.audio().join("003.wav").exists());
        session.render().unwrap();
        let frame = session.screen.frames.last().unwrap();
        assert!(frame.contains("|Error: sentence 3: synthesis error: no audio content"), "{frame}");
    }

    #[tokio::test]
    async fn test_playback_failure_reported_once_until_reload() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer { fail: true, ..Default::default() });

        session.handle(Command::Record).await;
        assert!(session.notice.as_deref().unwrap().contains("ffplay not found"));
        session.render().unwrap();

        session.handle(Command::Record).await;
        assert!(session.notice.is_none());
        assert!(fx.audio().join("001.wav").exists());

        session.handle(Command::Reload).await;
        session.render().unwrap();
        session.handle(Command::Record).await;
        assert!(session.notice.as_deref().unwrap().contains("ffplay not found"));
    }

    #[tokio::test]
    async fn test_reload_clamps_and_reports_position() {
        let fx = Fixture::new(FIVE);
        CursorStore::open(fx.settings()).save(4).unwrap();
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        fs::write(fx.dir.path().join("data.txt"), "Alpha. Beta. Gamma.").unwrap();
        session.handle(Command::Reload).await;

        assert_eq!(session.state().mode(), Mode::Viewing(2));
        assert_eq!(session.notice.as_deref(), Some("Sentence 3 / 3"));
        // reload alone does not persist
        assert_eq!(fx.saved_cursor(), 4);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_sentences() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        fs::remove_file(fx.dir.path().join("data.txt")).unwrap();
        session.handle(Command::Reload).await;

        assert_eq!(session.state().len(), 5);
        assert!(session.notice.as_deref().unwrap().starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_idle_refuses_navigation_and_recording() {
        let fx = Fixture::new("   \n");
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());
        assert_eq!(session.state().mode(), Mode::Idle);

        for command in [Command::Next, Command::Previous, Command::Record] {
            session.handle(command).await;
            assert!(session.notice.take().unwrap().starts_with("Nothing to process"));
        }
        assert!(session.gateway.requests.is_empty());
        assert!(!fx.settings().exists());

        fs::write(fx.dir.path().join("data.txt"), "Now there is text.").unwrap();
        session.handle(Command::Reload).await;
        assert_eq!(session.state().mode(), Mode::Viewing(0));
    }

    #[tokio::test]
    async fn test_run_quit_save() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        session.banner().unwrap();
        let outcome = session.run(&mut script(&[Command::Next, Command::Next, Command::Previous, Command::QuitSave])).await.unwrap();

        assert_eq!(outcome, Outcome::Saved);
        assert_eq!(session.state().mode(), Mode::Exiting);
        assert_eq!(fx.saved_cursor(), 1);
        assert_eq!(session.screen.frames[0], "banner 1/5");
        assert_eq!(session.screen.frames.last().unwrap(), "Two.|");
    }

    #[tokio::test]
    async fn test_run_quit_discard() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());

        let outcome = session.run(&mut script(&[Command::Previous, Command::Record, Command::QuitDiscard])).await.unwrap();

        assert_eq!(outcome, Outcome::Discarded);
        assert!(!fx.settings().exists());
    }

    #[tokio::test]
    async fn test_run_surfaces_input_failure() {
        let fx = Fixture::new(FIVE);
        let mut session = fx.session(FakeGateway::default(), FakePlayer::default());
        assert!(matches!(session.run(&mut script(&[Command::Next])).await, Err(Error::Input(_))));
    }
}
