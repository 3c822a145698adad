//! Mock engine launcher and sessions for testing

use crate::session::{EngineLauncher, EngineSession};
use crate::{EngineConfig, EngineError, Evaluation, RankedMove};
use async_trait::async_trait;
use cozy_chess::Move;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// How one mocked session answers. `None` in a field means that call fails.
#[derive(Clone)]
pub struct SessionScript {
    /// Whether `is_valid` answers at all.
    pub responsive: bool,
    /// Verdict for `is_valid` when responsive.
    pub accept: fn(&str) -> bool,
    pub set_position_ok: bool,
    pub top_moves: Option<Vec<RankedMove>>,
    pub best_move: Option<Option<Move>>,
    pub evaluation: Option<Evaluation>,
}

impl SessionScript {
    /// A session that answers everything, ranking `moves`.
    pub fn healthy(moves: Vec<RankedMove>, evaluation: Evaluation) -> Self {
        let best = moves.first().map(|m| m.mv);
        Self {
            responsive: true,
            accept: position::LegalityValidator::check,
            set_position_ok: true,
            top_moves: Some(moves),
            best_move: Some(best),
            evaluation: Some(evaluation),
        }
    }

    /// A session that fails every call.
    pub fn broken() -> Self {
        Self {
            responsive: false,
            accept: |_| false,
            set_position_ok: false,
            top_moves: None,
            best_move: None,
            evaluation: None,
        }
    }

    /// Passes the liveness check but fails every query.
    pub fn wedged() -> Self {
        Self {
            responsive: true,
            accept: position::LegalityValidator::check,
            ..Self::broken()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Launch { session: usize },
    LaunchFailed,
    IsValid { session: usize, fen: String },
    SetPosition { session: usize, fen: String },
    TopMoves { session: usize, count: usize },
    BestMove { session: usize },
    Evaluation { session: usize },
    Shutdown { session: usize },
}

/// Launcher that hands out scripted sessions in order. Once the queue is
/// empty every launch fails.
#[derive(Clone, Default)]
pub struct MockLauncher {
    scripts: Arc<Mutex<VecDeque<Option<SessionScript>>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    launched: Arc<Mutex<usize>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session for the next launch.
    pub fn with_session(self, script: SessionScript) -> Self {
        self.scripts.lock().unwrap().push_back(Some(script));
        self
    }

    /// Queue a launch failure.
    pub fn with_launch_failure(self) -> Self {
        self.scripts.lock().unwrap().push_back(None);
        self
    }

    /// Get recorded calls for verification
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.call_log.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn log_call(&self, call: MockCall) {
        self.call_log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self, _config: &EngineConfig) -> Result<Box<dyn EngineSession>, EngineError> {
        let script = self.scripts.lock().unwrap().pop_front().flatten();
        let Some(script) = script else {
            self.log_call(MockCall::LaunchFailed);
            return Err(EngineError::NotFound);
        };
        let session = {
            let mut launched = self.launched.lock().unwrap();
            *launched += 1;
            *launched
        };
        self.log_call(MockCall::Launch { session });
        Ok(Box::new(MockSession {
            id: session,
            script,
            launcher: self.clone(),
        }))
    }
}

pub struct MockSession {
    id: usize,
    script: SessionScript,
    launcher: MockLauncher,
}

fn unresponsive() -> EngineError {
    EngineError::Timeout("mock response")
}

#[async_trait]
impl EngineSession for MockSession {
    async fn is_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
        self.launcher.log_call(MockCall::IsValid {
            session: self.id,
            fen: fen.to_string(),
        });
        if !self.script.responsive {
            return Err(unresponsive());
        }
        Ok((self.script.accept)(fen))
    }

    async fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.launcher.log_call(MockCall::SetPosition {
            session: self.id,
            fen: fen.to_string(),
        });
        if self.script.set_position_ok {
            Ok(())
        } else {
            Err(unresponsive())
        }
    }

    async fn top_moves(&mut self, count: usize) -> Result<Vec<RankedMove>, EngineError> {
        self.launcher.log_call(MockCall::TopMoves {
            session: self.id,
            count,
        });
        self.script
            .top_moves
            .as_ref()
            .map(|moves| moves.iter().take(count).cloned().collect())
            .ok_or_else(unresponsive)
    }

    async fn best_move(&mut self) -> Result<Option<Move>, EngineError> {
        self.launcher
            .log_call(MockCall::BestMove { session: self.id });
        self.script.best_move.ok_or_else(unresponsive)
    }

    async fn evaluation(&mut self) -> Result<Evaluation, EngineError> {
        self.launcher
            .log_call(MockCall::Evaluation { session: self.id });
        self.script.evaluation.ok_or_else(unresponsive)
    }

    async fn shutdown(self: Box<Self>) {
        self.launcher
            .log_call(MockCall::Shutdown { session: self.id });
    }
}
