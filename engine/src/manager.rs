//! Engine query orchestration.
//!
//! The manager owns the one live engine session and answers queries with a
//! bounded recovery ladder: a failed ranked request earns one restart and
//! one retry, a second failure earns one best-move-only request, and after
//! that the engine is reported unavailable. The ladder is an explicit state
//! machine ([`transition`]) so the bound is visible in the table itself.

use async_trait::async_trait;
use position::{ActiveColor, FenValidator, STARTING_FEN};

use crate::evaluation::{normalize, normalize_ranked};
use crate::session::{EngineLauncher, EngineSession};
use crate::{EngineConfig, EngineError, Evaluation, MoveResult, RankedMove};

/// Which recovery step a degraded query is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Replace the session and retry the ranked request.
    Restart,
    /// Ask the fresh session for a single best move.
    BestMoveOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Querying,
    Degraded(Recovery),
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEvent {
    PositionSet,
    PositionFailed,
    LivenessFailed,
    RankedOk,
    /// Ranked request answered with an empty list.
    NoMoves,
    RankedFailed,
    RestartFailed,
    BestMoveOk,
    BestMoveFailed,
}

/// The recovery ladder's transition table. `None` marks an event that has
/// no meaning in the given state.
///
/// Nothing leads back into `Degraded(Restart)` from a degraded state, which
/// caps every query at one restart.
pub fn transition(state: QueryState, event: QueryEvent) -> Option<QueryState> {
    use QueryEvent as E;
    use QueryState as S;

    match (state, event) {
        (S::Idle, E::PositionSet) => Some(S::Querying),
        (S::Idle, E::PositionFailed) => Some(S::Degraded(Recovery::Restart)),

        (S::Querying, E::LivenessFailed) => Some(S::Fatal),
        (S::Querying, E::RankedOk | E::NoMoves) => Some(S::Idle),
        (S::Querying, E::RankedFailed) => Some(S::Degraded(Recovery::Restart)),

        (S::Degraded(Recovery::Restart), E::RankedOk | E::NoMoves) => Some(S::Idle),
        (S::Degraded(Recovery::Restart), E::RankedFailed) => {
            Some(S::Degraded(Recovery::BestMoveOnly))
        }
        (S::Degraded(Recovery::Restart), E::RestartFailed) => Some(S::Fatal),

        (S::Degraded(Recovery::BestMoveOnly), E::BestMoveOk) => Some(S::Idle),
        (S::Degraded(Recovery::BestMoveOnly), E::BestMoveFailed) => Some(S::Fatal),

        _ => None,
    }
}

type Outcome = Option<Result<MoveResult, EngineError>>;

/// Owns the engine session and runs queries against it.
pub struct EngineQueryManager<L: EngineLauncher> {
    launcher: L,
    config: EngineConfig,
    session: Option<Box<dyn EngineSession>>,
    state: QueryState,
}

impl<L: EngineLauncher> EngineQueryManager<L> {
    /// Launch the first session. Failure means no engine for this run.
    #[tracing::instrument(level = "info", skip(launcher))]
    pub async fn start(launcher: L, config: EngineConfig) -> Result<Self, EngineError> {
        let session = launcher.launch(&config).await.map_err(|e| {
            tracing::error!("Failed to initialize engine: {}", e);
            EngineError::Unavailable(e.to_string())
        })?;
        Ok(Self {
            launcher,
            config,
            session: Some(session),
            state: QueryState::Idle,
        })
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Find the best moves for a FEN that has already been validated.
    ///
    /// Scores in the result are from the side to move's point of view.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn query(&mut self, fen: &str) -> Result<MoveResult, EngineError> {
        let active_color = fen
            .split_whitespace()
            .nth(1)
            .and_then(ActiveColor::from_token)
            .unwrap_or(ActiveColor::White);

        self.ensure_session().await?;
        self.state = QueryState::Idle;

        loop {
            let (event, outcome) = match self.state {
                QueryState::Idle => self.place(fen).await,
                QueryState::Querying => self.ranked(active_color).await,
                QueryState::Degraded(Recovery::Restart) => {
                    self.restart_and_retry(fen, active_color).await
                }
                QueryState::Degraded(Recovery::BestMoveOnly) => self.best_move_only().await,
                QueryState::Fatal => {
                    return Err(EngineError::Unavailable("engine failed".to_string()))
                }
            };

            let next = transition(self.state, event).unwrap_or_else(|| {
                tracing::error!("No transition from {:?} on {:?}", self.state, event);
                QueryState::Fatal
            });
            tracing::debug!("{:?} --{:?}--> {:?}", self.state, event, next);
            self.state = next;

            if let Some(result) = outcome {
                return result;
            }
            if self.state == QueryState::Fatal {
                return Err(EngineError::Unavailable("engine failed".to_string()));
            }
        }
    }

    /// Relaunch once if an earlier restart left no session behind.
    async fn ensure_session(&mut self) -> Result<(), EngineError> {
        if self.session.is_some() {
            return Ok(());
        }
        tracing::info!("No live engine session, relaunching");
        match self.launcher.launch(&self.config).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = QueryState::Idle;
                Ok(())
            }
            Err(e) => {
                self.state = QueryState::Fatal;
                Err(EngineError::Unavailable(e.to_string()))
            }
        }
    }

    async fn place(&mut self, fen: &str) -> (QueryEvent, Outcome) {
        let Some(session) = self.session.as_mut() else {
            return (QueryEvent::PositionFailed, None);
        };
        match session.set_position(fen).await {
            Ok(()) => (QueryEvent::PositionSet, None),
            Err(e) => {
                tracing::warn!("Failed to set position: {}", e);
                (QueryEvent::PositionFailed, None)
            }
        }
    }

    async fn ranked(&mut self, active_color: ActiveColor) -> (QueryEvent, Outcome) {
        let Some(session) = self.session.as_mut() else {
            return (QueryEvent::RankedFailed, None);
        };

        match session.is_valid(STARTING_FEN).await {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                tracing::error!("Engine is not responsive");
                return (
                    QueryEvent::LivenessFailed,
                    Some(Err(EngineError::Unavailable(
                        "engine failed its liveness check".to_string(),
                    ))),
                );
            }
        }

        self.request_ranked(active_color).await
    }

    /// Ranked request on the current session, shared by the first attempt
    /// and the post-restart retry.
    async fn request_ranked(&mut self, active_color: ActiveColor) -> (QueryEvent, Outcome) {
        let count = self.config.top_moves();
        let Some(session) = self.session.as_mut() else {
            return (QueryEvent::RankedFailed, None);
        };

        let moves = match session.top_moves(count).await {
            Ok(moves) => moves,
            Err(e) => {
                tracing::warn!("Failed to get top moves: {}", e);
                return (QueryEvent::RankedFailed, None);
            }
        };
        if moves.is_empty() {
            tracing::warn!("No valid moves found");
            return (QueryEvent::NoMoves, Some(Err(EngineError::NoMoves)));
        }

        let evaluation = session.evaluation().await.unwrap_or_else(|e| {
            tracing::warn!("Evaluation unavailable: {}", e);
            Evaluation::Unknown
        });
        (
            QueryEvent::RankedOk,
            Some(Ok(build_result(moves, evaluation, active_color))),
        )
    }

    async fn restart_and_retry(&mut self, fen: &str, active_color: ActiveColor) -> (QueryEvent, Outcome) {
        tracing::warn!("Attempting to restart engine");
        if let Some(old) = self.session.take() {
            old.shutdown().await;
        }

        match self.launcher.launch(&self.config).await {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                tracing::error!("Could not restart engine: {}", e);
                return (
                    QueryEvent::RestartFailed,
                    Some(Err(EngineError::Unavailable(format!("restart failed: {}", e)))),
                );
            }
        }

        if let (QueryEvent::PositionFailed, _) = self.place(fen).await {
            return (QueryEvent::RankedFailed, None);
        }
        let retried = self.request_ranked(active_color).await;
        if retried.0 == QueryEvent::RankedOk {
            tracing::info!("Successfully restarted engine and got moves");
        }
        retried
    }

    async fn best_move_only(&mut self) -> (QueryEvent, Outcome) {
        tracing::warn!("Trying single best move as final fallback");
        let Some(session) = self.session.as_mut() else {
            return (QueryEvent::BestMoveFailed, None);
        };

        match session.best_move().await {
            Ok(Some(best)) => (
                QueryEvent::BestMoveOk,
                Some(Ok(MoveResult {
                    best,
                    ranked: Vec::new(),
                    evaluation: Evaluation::Unknown,
                    degraded: true,
                })),
            ),
            Ok(None) => {
                tracing::error!("No moves available");
                (
                    QueryEvent::BestMoveFailed,
                    Some(Err(EngineError::Unavailable(
                        "fallback returned no move".to_string(),
                    ))),
                )
            }
            Err(e) => {
                tracing::error!("All fallback attempts failed: {}", e);
                (
                    QueryEvent::BestMoveFailed,
                    Some(Err(EngineError::Unavailable(e.to_string()))),
                )
            }
        }
    }

    /// Shut the session down.
    pub async fn shutdown(mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }
}

fn build_result(
    moves: Vec<RankedMove>,
    evaluation: Evaluation,
    active_color: ActiveColor,
) -> MoveResult {
    let ranked = normalize_ranked(moves, active_color);
    let best = ranked[0].mv;
    MoveResult {
        best,
        ranked,
        evaluation: normalize(evaluation, active_color),
        degraded: false,
    }
}

/// Validates through the live session so repairs are judged by the same
/// engine that will be queried.
///
/// A lost session is relaunched first. A session that does not answer is
/// shut down and reported as unavailable, so the next cycle starts fresh.
#[async_trait]
impl<L: EngineLauncher> FenValidator for EngineQueryManager<L> {
    type Error = EngineError;

    async fn is_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
        self.ensure_session().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(EngineError::Unavailable("no engine session".to_string()));
        };
        match session.is_valid(fen).await {
            Ok(valid) => Ok(valid),
            Err(e) => {
                tracing::error!("Engine did not answer validation of {}: {}", fen, e);
                if let Some(session) = self.session.take() {
                    session.shutdown().await;
                }
                self.state = QueryState::Fatal;
                Err(EngineError::Unavailable(e.to_string()))
            }
        }
    }
}
