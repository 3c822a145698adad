//! Engine session capability.
//!
//! A session is one live engine connection. Scores it reports are
//! White-positive; the manager turns them mover-positive.

use async_trait::async_trait;
use cozy_chess::Move;

use crate::stockfish::StockfishEngine;
use crate::{EngineConfig, EngineError, Evaluation, RankedMove};

/// Core engine session interface
/// Implemented by both StockfishEngine and MockSession
#[async_trait]
pub trait EngineSession: Send {
    /// Whether `fen` describes a usable position. An error means the
    /// engine itself did not answer.
    async fn is_valid(&mut self, fen: &str) -> Result<bool, EngineError>;

    /// Make `fen` the current position.
    async fn set_position(&mut self, fen: &str) -> Result<(), EngineError>;

    /// Up to `count` candidate moves for the current position, best first.
    async fn top_moves(&mut self, count: usize) -> Result<Vec<RankedMove>, EngineError>;

    /// The single best move, `None` when there is none.
    async fn best_move(&mut self) -> Result<Option<Move>, EngineError>;

    async fn evaluation(&mut self) -> Result<Evaluation, EngineError>;

    /// Terminate the engine and release its process.
    async fn shutdown(self: Box<Self>);
}

/// Creates sessions. Used once at start-up and again for each restart.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self, config: &EngineConfig) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// Launches Stockfish processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockfishLauncher;

#[async_trait]
impl EngineLauncher for StockfishLauncher {
    async fn launch(&self, config: &EngineConfig) -> Result<Box<dyn EngineSession>, EngineError> {
        let engine = StockfishEngine::spawn(config).await?;
        Ok(Box::new(engine))
    }
}
