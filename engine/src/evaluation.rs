//! Evaluation perspective handling.
//!
//! Sessions report scores White-positive. Results handed to callers are
//! mover-positive: for Black to move every numeric score is negated, in the
//! single evaluation and in each ranked candidate alike.

use position::ActiveColor;

use crate::{RankedMove, Score};

/// Position evaluation. `Unknown` covers an engine that could not produce
/// one; it is never negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Score(Score),
    Unknown,
}

impl Evaluation {
    pub fn display(&self) -> String {
        match self {
            Self::Score(score) => score.display(),
            Self::Unknown => "N/A".to_string(),
        }
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn orient(score: Score, active_color: ActiveColor) -> Score {
    match active_color {
        ActiveColor::White => score,
        ActiveColor::Black => score.negate(),
    }
}

/// Re-express a White-positive evaluation from the mover's side.
pub fn normalize(evaluation: Evaluation, active_color: ActiveColor) -> Evaluation {
    match evaluation {
        Evaluation::Score(score) => Evaluation::Score(orient(score, active_color)),
        Evaluation::Unknown => Evaluation::Unknown,
    }
}

/// Apply [`normalize`]'s rule to every ranked candidate.
pub fn normalize_ranked(moves: Vec<RankedMove>, active_color: ActiveColor) -> Vec<RankedMove> {
    moves
        .into_iter()
        .map(|m| RankedMove {
            mv: m.mv,
            score: m.score.map(|s| orient(s, active_color)),
        })
        .collect()
}
