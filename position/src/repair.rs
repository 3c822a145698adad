//! FEN repair cascade.
//!
//! A vision-derived placement carries no game state, so castling rights and
//! side to move are guesses. The cascade tries a fixed ladder of guesses and
//! keeps the first one the validator accepts. Validation only asks; it never
//! sets a position on an engine.

use async_trait::async_trait;
use cozy_chess::Board;
use serde::Serialize;
use std::convert::Infallible;

use crate::types::ActiveColor;

/// Something that can judge whether a full FEN describes a usable position.
///
/// `Ok(false)` is a rejection; `Err` means no verdict could be obtained and
/// aborts the cascade.
#[async_trait]
pub trait FenValidator: Send {
    type Error: std::error::Error + Send + 'static;

    async fn is_valid(&mut self, fen: &str) -> Result<bool, Self::Error>;
}

/// Which rung of the ladder produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Detected side, all castling rights.
    FullRights,
    /// Detected side, no castling rights.
    NoCastling,
    /// Opposite side, no castling rights.
    OppositeColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFen {
    pub kind: CandidateKind,
    pub active_color: ActiveColor,
    pub fen: String,
}

/// A candidate that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedFen {
    pub fen: String,
    pub active_color: ActiveColor,
    pub kind: CandidateKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepairError<E: std::error::Error + 'static = Infallible> {
    #[error("no candidate FEN was accepted for placement {placement}")]
    NoValidCandidate { placement: String },
    #[error("validator did not answer: {0}")]
    Validator(#[source] E),
}

/// Build the three candidates in the order they are tried.
pub fn candidates(placement: &str, active_color: ActiveColor) -> [CandidateFen; 3] {
    let opposite = active_color.opposite();
    [
        CandidateFen {
            kind: CandidateKind::FullRights,
            active_color,
            fen: format!("{} {} KQkq - 0 1", placement, active_color.fen_token()),
        },
        CandidateFen {
            kind: CandidateKind::NoCastling,
            active_color,
            fen: format!("{} {} - - 0 1", placement, active_color.fen_token()),
        },
        CandidateFen {
            kind: CandidateKind::OppositeColor,
            active_color: opposite,
            fen: format!("{} {} - - 0 1", placement, opposite.fen_token()),
        },
    ]
}

/// Return the first candidate the validator accepts.
///
/// Calls the validator once per candidate, stopping at the first
/// acceptance or the first validator error, so between one and three times.
pub async fn repair<V>(
    placement: &str,
    active_color: ActiveColor,
    validator: &mut V,
) -> Result<RepairedFen, RepairError<V::Error>>
where
    V: FenValidator + ?Sized,
{
    for candidate in candidates(placement, active_color) {
        let accepted = validator
            .is_valid(&candidate.fen)
            .await
            .map_err(RepairError::Validator)?;
        if accepted {
            if candidate.kind != CandidateKind::FullRights {
                tracing::info!("Repaired FEN ({:?}): {}", candidate.kind, candidate.fen);
            }
            return Ok(RepairedFen {
                fen: candidate.fen,
                active_color: candidate.active_color,
                kind: candidate.kind,
            });
        }
        tracing::warn!("Rejected FEN candidate: {}", candidate.fen);
    }

    tracing::error!("Could not build a valid FEN from {}", placement);
    Err(RepairError::NoValidCandidate {
        placement: placement.to_string(),
    })
}

/// Validator backed by cozy-chess's FEN parser, which rejects illegal
/// setups such as castling rights without the king and rook at home or the
/// side not to move standing in check.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegalityValidator;

impl LegalityValidator {
    pub fn check(fen: &str) -> bool {
        Board::from_fen(fen, false).is_ok()
    }
}

#[async_trait]
impl FenValidator for LegalityValidator {
    type Error = Infallible;

    async fn is_valid(&mut self, fen: &str) -> Result<bool, Infallible> {
        Ok(Self::check(fen))
    }
}
