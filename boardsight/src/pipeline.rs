//! One analysis cycle: board reading in, recommended move out.

use engine::uci::format_uci_move;
use engine::{EngineError, EngineLauncher, EngineQueryManager, Evaluation, Score};
use position::{
    arrowhead, infer, move_to_pixels, repair, ActiveColor, BoardCorners, CandidateKind,
    Orientation, Pixel, RepairError,
};
use serde::Serialize;

/// What the vision step hands over for one screenshot.
#[derive(Debug, Clone)]
pub struct BoardReading {
    /// Placement as read off the image, top rank first.
    pub placement: String,
    /// Per-tile classifier confidences, if the classifier reports them.
    pub confidences: Vec<f32>,
    pub corners: Option<BoardCorners>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Every repair candidate was rejected.
    #[error("no candidate FEN was accepted for placement {placement}")]
    Validation { placement: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<RepairError<EngineError>> for PipelineError {
    fn from(e: RepairError<EngineError>) -> Self {
        match e {
            RepairError::NoValidCandidate { placement } => Self::Validation { placement },
            RepairError::Validator(e) => Self::Engine(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(rename = "move")]
    pub uci: String,
    pub score: Option<Score>,
}

/// Where to draw the recommendation on the source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrow {
    pub from: Pixel,
    pub to: Pixel,
    pub head: Option<[Pixel; 3]>,
}

/// Result of a full cycle. Scores are from the side to move's view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Placement with White at the bottom.
    pub placement: String,
    pub orientation: Orientation,
    pub active_color: ActiveColor,
    pub fen: String,
    pub repair: CandidateKind,
    pub best_move: String,
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
    /// `None` when the engine could not evaluate.
    pub evaluation: Option<Score>,
    pub candidates: Vec<Candidate>,
    /// Only the single best move could be obtained.
    pub degraded: bool,
    pub arrow: Option<Arrow>,
}

fn min_confidence(confidences: &[f32]) -> Option<f32> {
    confidences.iter().copied().reduce(f32::min)
}

/// Run normalization, repair, engine query and annotation for one reading.
///
/// The manager doubles as the repair validator, so candidate FENs are
/// judged by the same engine that answers the query.
#[tracing::instrument(level = "info", skip_all)]
pub async fn analyze<L: EngineLauncher>(
    manager: &mut EngineQueryManager<L>,
    reading: &BoardReading,
    manual: Option<ActiveColor>,
) -> Result<Analysis, PipelineError> {
    if let Some(min) = min_confidence(&reading.confidences) {
        tracing::info!("Minimum tile confidence: {:.3}", min);
    }

    let inference = infer(&reading.placement, manual);
    let repaired = repair(&inference.placement, inference.active_color, &mut *manager).await?;
    tracing::info!("Querying engine with FEN: {}", repaired.fen);

    let result = manager.query(&repaired.fen).await?;
    if result.degraded {
        tracing::warn!("Engine answered with its fallback best move only");
    }

    let best_move = format_uci_move(&result.best);
    let arrow = reading
        .corners
        .as_ref()
        .and_then(|corners| annotate(&best_move, corners));

    let evaluation = match result.evaluation {
        Evaluation::Score(score) => Some(score),
        Evaluation::Unknown => None,
    };
    let candidates = result
        .ranked
        .iter()
        .map(|m| Candidate {
            uci: format_uci_move(&m.mv),
            score: m.score,
        })
        .collect();

    Ok(Analysis {
        placement: inference.placement,
        orientation: inference.orientation,
        active_color: repaired.active_color,
        fen: repaired.fen,
        repair: repaired.kind,
        from: best_move[0..2].to_string(),
        to: best_move[2..4].to_string(),
        promotion: best_move.chars().nth(4),
        best_move,
        evaluation,
        candidates,
        degraded: result.degraded,
        arrow,
    })
}

fn annotate(best_move: &str, corners: &BoardCorners) -> Option<Arrow> {
    let Some((from, to)) = move_to_pixels(best_move, corners) else {
        tracing::warn!("Could not map {} onto the board image", best_move);
        return None;
    };
    Some(Arrow {
        from,
        to,
        head: arrowhead(from, to),
    })
}

/// Human-readable summary of an analysis.
pub fn render(analysis: &Analysis) -> String {
    let mut out = String::new();
    out.push_str(&format!("Position:    {}\n", analysis.fen));
    out.push_str(&format!(
        "Orientation: {} ({} to move)\n",
        analysis.orientation, analysis.active_color
    ));

    let promotion = analysis
        .promotion
        .map(|p| format!(" ={}", p.to_ascii_uppercase()))
        .unwrap_or_default();
    out.push_str(&format!(
        "Best move:   {} -> {}{}\n",
        analysis.from, analysis.to, promotion
    ));

    let evaluation = analysis
        .evaluation
        .map(|s| s.display())
        .unwrap_or_else(|| Evaluation::Unknown.display());
    out.push_str(&format!("Evaluation:  {}\n", evaluation));

    if analysis.degraded {
        out.push_str("(engine fallback: no ranking available)\n");
    }
    for (i, candidate) in analysis.candidates.iter().enumerate() {
        let score = candidate
            .score
            .map(|s| s.display())
            .unwrap_or_else(|| "?".to_string());
        out.push_str(&format!("  {}. {} ({})\n", i + 1, candidate.uci, score));
    }
    if let Some(arrow) = &analysis.arrow {
        out.push_str(&format!(
            "Arrow:       ({}, {}) -> ({}, {})\n",
            arrow.from.x, arrow.from.y, arrow.to.x, arrow.to.y
        ));
    }
    out
}
