pub mod evaluation;
pub mod manager;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod session;
pub mod stockfish;
pub mod uci;

pub use evaluation::{normalize, normalize_ranked, Evaluation};
pub use manager::{transition, EngineQueryManager, QueryEvent, QueryState, Recovery};
pub use session::{EngineLauncher, EngineSession, StockfishLauncher};
pub use stockfish::StockfishEngine;
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fields of one `info` line that the search loop reads.
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub multipv: Option<u8>,
    pub score: Option<Score>,
    pub nodes: Option<u64>,
    /// Principal variation, first move first.
    pub pv: Vec<Move>,
}

/// Engine evaluation score.
///
/// Mate: positive N = the favoured side mates in N moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// Negate the score (flip perspective).
    pub fn negate(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            // Side to move is already mated; the sign carries no information.
            Self::Mate(0) => "#0".to_string(),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One entry of a ranked candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedMove {
    pub mv: Move,
    pub score: Option<Score>,
}

/// Outcome of a successful query, scores already normalized so the side
/// to move is positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub best: Move,
    pub ranked: Vec<RankedMove>,
    pub evaluation: Evaluation,
    /// Set when only the best-move fallback answered: `ranked` is empty and
    /// the evaluation is unknown.
    pub degraded: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("Stockfish not found")]
    NotFound,
    #[error("failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine has no {0}")]
    MissingPipe(&'static str),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("engine closed its output")]
    Closed,
    #[error(transparent)]
    Uci(#[from] UciError),
    #[error("no legal moves in position")]
    NoMoves,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("skill level {0} is outside 0-20")]
    SkillLevel(u8),
    #[error("search depth {0} is outside 1-20")]
    Depth(u8),
}

const DEFAULT_SKILL_LEVEL: u8 = 10;
const DEFAULT_DEPTH: u8 = 6;
const DEFAULT_TOP_MOVES: usize = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable engine configuration, shared by every session a manager
/// launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    skill_level: u8,
    depth: u8,
    threads: Option<u32>,
    hash_mb: Option<u32>,
    top_moves: usize,
    path: Option<PathBuf>,
    timeout: Duration,
}

impl EngineConfig {
    pub fn new(skill_level: u8, depth: u8) -> Result<Self, ConfigError> {
        if skill_level > 20 {
            return Err(ConfigError::SkillLevel(skill_level));
        }
        if !(1..=20).contains(&depth) {
            return Err(ConfigError::Depth(depth));
        }
        Ok(Self {
            skill_level,
            depth,
            threads: None,
            hash_mb: None,
            top_moves: DEFAULT_TOP_MOVES,
            path: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_hash_mb(mut self, hash_mb: u32) -> Self {
        self.hash_mb = Some(hash_mb);
        self
    }

    /// Number of ranked candidates to request; at least one.
    pub fn with_top_moves(mut self, count: usize) -> Self {
        self.top_moves = count.max(1);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Upper bound on any single wait for engine output.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skill_level(&self) -> u8 {
        self.skill_level
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn threads(&self) -> Option<u32> {
        self.threads
    }

    pub fn hash_mb(&self) -> Option<u32> {
        self.hash_mb
    }

    pub fn top_moves(&self) -> usize {
        self.top_moves
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skill_level: DEFAULT_SKILL_LEVEL,
            depth: DEFAULT_DEPTH,
            threads: None,
            hash_mb: None,
            top_moves: DEFAULT_TOP_MOVES,
            path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
