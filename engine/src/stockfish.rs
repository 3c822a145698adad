use crate::session::EngineSession;
use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineConfig, EngineError, Evaluation, RankedMove, Score};
use async_trait::async_trait;
use cozy_chess::{Color, Move};
use position::{ActiveColor, LegalityValidator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

/// A Stockfish process driven one request at a time.
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    depth: u8,
    timeout: Duration,
    side_to_move: Color,
    /// White-positive score of the last search on the current position.
    last_score: Option<Score>,
}

/// Lines collected from one `go` until `bestmove`. Scores are stored as
/// reported, relative to the side to move.
#[derive(Debug, Default)]
struct SearchOutcome {
    /// Latest info per multipv index (1-based).
    lines: BTreeMap<u8, (Option<Score>, Move)>,
    best: Option<Move>,
    depth: Option<u8>,
    nodes: Option<u64>,
}

impl SearchOutcome {
    /// Fold one engine message into the outcome. Later lines for the same
    /// multipv index replace earlier, shallower ones.
    fn observe(&mut self, msg: &UciMessage) {
        match msg {
            UciMessage::Info(info) => {
                self.depth = info.depth.or(self.depth);
                self.nodes = info.nodes.or(self.nodes);
                if let Some(&first) = info.pv.first() {
                    self.lines
                        .insert(info.multipv.unwrap_or(1), (info.score, first));
                }
            }
            UciMessage::BestMove { mv, .. } => self.best = *mv,
            _ => {}
        }
    }

    /// Up to `count` lines in multipv order, scores White-positive.
    fn ranked(&self, count: usize, side_to_move: Color) -> Vec<RankedMove> {
        self.lines
            .values()
            .take(count)
            .map(|(score, mv)| RankedMove {
                mv: *mv,
                score: score.map(|s| white_positive(s, side_to_move)),
            })
            .collect()
    }

    /// White-positive score of the principal line.
    fn principal_score(&self, side_to_move: Color) -> Option<Score> {
        self.lines
            .get(&1)
            .and_then(|(score, _)| *score)
            .map(|s| white_positive(s, side_to_move))
    }
}

/// UCI scores are relative to the side to move.
fn white_positive(score: Score, side_to_move: Color) -> Score {
    match side_to_move {
        Color::White => score,
        Color::Black => score.negate(),
    }
}

impl StockfishEngine {
    /// Spawn and initialise a Stockfish instance.
    #[tracing::instrument(level = "info")]
    pub async fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        tracing::info!("Starting Stockfish engine spawn (config: {:?})", config);
        let path = match config.path() {
            Some(path) => path.to_path_buf(),
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Spawn(e)
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or(EngineError::MissingPipe("stdout"))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            depth: config.depth(),
            timeout: config.timeout(),
            side_to_move: Color::White,
            last_score: None,
        };

        engine.send("uci").await?;
        engine
            .wait_for("uciok", |msg| matches!(msg, UciMessage::UciOk))
            .await?;
        tracing::debug!("Received uciok, engine ready");

        tracing::info!("Setting skill level to {}", config.skill_level());
        engine
            .send(&format!("setoption name Skill Level value {}", config.skill_level()))
            .await?;

        if let Some(threads) = config.threads() {
            let threads = threads.clamp(1, 16);
            tracing::info!("Setting Threads to {}", threads);
            engine
                .send(&format!("setoption name Threads value {}", threads))
                .await?;
        }

        if let Some(hash_mb) = config.hash_mb() {
            let hash_mb = hash_mb.clamp(1, 2048);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            engine
                .send(&format!("setoption name Hash value {}", hash_mb))
                .await?;
        }

        engine.sync().await?;
        tracing::info!("Stockfish engine spawned and initialized successfully");
        Ok(engine)
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin.write_all(cmd.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read messages until one satisfies `done`, handing each parsed
    /// message to `observe` first. Bounded by the configured timeout.
    async fn read_until<F, O>(
        &mut self,
        what: &'static str,
        mut done: F,
        mut observe: O,
    ) -> Result<UciMessage, EngineError>
    where
        F: FnMut(&UciMessage) -> bool,
        O: FnMut(&UciMessage),
    {
        let timeout = self.timeout;
        let stdout = &mut self.stdout;
        let read = async {
            loop {
                let line = match stdout.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::warn!("Stockfish stdout EOF - engine closed");
                        return Err(EngineError::Closed);
                    }
                    Err(e) => {
                        tracing::error!("Error reading from Stockfish stdout: {}", e);
                        return Err(EngineError::Io(e));
                    }
                };
                let trimmed = line.trim();
                tracing::trace!("UCI << {}", trimmed);
                match parse_uci_message(trimmed) {
                    Ok(msg) => {
                        observe(&msg);
                        if done(&msg) {
                            return Ok(msg);
                        }
                    }
                    Err(_) => tracing::trace!("Ignoring UCI line: {}", trimmed),
                }
            }
        };

        tokio::time::timeout(timeout, read).await.map_err(|_| {
            tracing::error!("Timeout waiting for {}", what);
            EngineError::Timeout(what)
        })?
    }

    async fn wait_for<F>(&mut self, what: &'static str, done: F) -> Result<UciMessage, EngineError>
    where
        F: FnMut(&UciMessage) -> bool,
    {
        self.read_until(what, done, |_| {}).await
    }

    /// `isready` round trip; proves the process is still answering.
    async fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready").await?;
        self.wait_for("readyok", |msg| matches!(msg, UciMessage::ReadyOk))
            .await?;
        Ok(())
    }

    /// Run a fixed-depth search, keeping the deepest line per multipv index.
    async fn search(&mut self) -> Result<SearchOutcome, EngineError> {
        tracing::info!("Starting engine calculation with depth={}", self.depth);
        self.send(&go_command(self.depth)).await?;

        let mut outcome = SearchOutcome::default();
        self.read_until(
            "bestmove",
            |msg| matches!(msg, UciMessage::BestMove { .. }),
            |msg| outcome.observe(msg),
        )
        .await?;
        tracing::debug!(
            "Search done: depth {:?}, {:?} nodes, {} lines",
            outcome.depth,
            outcome.nodes,
            outcome.lines.len()
        );

        self.last_score = outcome.principal_score(self.side_to_move);
        Ok(outcome)
    }
}

#[async_trait]
impl EngineSession for StockfishEngine {
    async fn is_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
        self.sync().await?;
        Ok(LegalityValidator::check(fen))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        tracing::info!("Setting position: FEN={}", fen);
        self.send(&format!("position fen {}", fen)).await?;
        self.sync().await?;
        self.side_to_move = fen
            .split_whitespace()
            .nth(1)
            .and_then(ActiveColor::from_token)
            .map(Color::from)
            .unwrap_or(Color::White);
        self.last_score = None;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn top_moves(&mut self, count: usize) -> Result<Vec<RankedMove>, EngineError> {
        self.send(&format!("setoption name MultiPV value {}", count))
            .await?;
        let outcome = self.search().await;
        self.send("setoption name MultiPV value 1").await?;
        Ok(outcome?.ranked(count, self.side_to_move))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn best_move(&mut self) -> Result<Option<Move>, EngineError> {
        let outcome = self.search().await?;
        tracing::info!("Received bestmove: {:?}", outcome.best);
        Ok(outcome.best)
    }

    async fn evaluation(&mut self) -> Result<Evaluation, EngineError> {
        if self.last_score.is_none() {
            self.search().await?;
        }
        Ok(self
            .last_score
            .map(Evaluation::Score)
            .unwrap_or(Evaluation::Unknown))
    }

    async fn shutdown(self: Box<Self>) {
        let mut engine = self;
        tracing::info!("Sending quit command to engine");
        let _ = engine.send("quit").await;
        let _ = tokio::time::timeout(Duration::from_secs(1), engine.process.wait()).await;
        let _ = engine.process.kill().await;
    }
}

fn go_command(depth: u8) -> String {
    format!("go depth {}", depth)
}

/// Find Stockfish executable in common locations
fn find_stockfish_path() -> Option<PathBuf> {
    // Common paths to check
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            // Try to verify it's actually runnable
            if std::process::Command::new(path_str)
                .arg("--help")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .output()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}
