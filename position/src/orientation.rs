//! Orientation and side-to-move inference.
//!
//! The vision step reads the board exactly as it appears in the image, so
//! when the player sits on the Black side the placement comes out upside
//! down. The bottom rank's piece colors decide which way round it is.

use crate::placement::{rotate, PiecePlacement};
use crate::types::{ActiveColor, Orientation};

/// Outcome of [`infer`]: the placement re-expressed with White at the
/// bottom, plus how it was oriented and who is to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub placement: String,
    pub orientation: Orientation,
    pub active_color: ActiveColor,
}

/// Infer orientation and side to move from a raw placement string.
///
/// A manual side overrides detection; choosing Black is taken to mean the
/// image shows Black at the bottom. Malformed input never fails here and
/// falls back to (Normal, White), leaving the validator to reject it.
pub fn infer(raw: &str, manual: Option<ActiveColor>) -> Inference {
    let parsed = match PiecePlacement::parse(raw) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!("Could not parse placement {:?}: {}", raw, e);
            None
        }
    };
    let placement = parsed
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| raw.to_string());

    let (orientation, active_color) = match (manual, parsed.as_ref()) {
        (Some(ActiveColor::Black), _) => (Orientation::Flipped, ActiveColor::Black),
        (Some(ActiveColor::White), _) => (Orientation::Normal, ActiveColor::White),
        (None, Some(p)) => detect(p),
        (None, None) => (Orientation::Normal, ActiveColor::White),
    };

    tracing::info!(
        "Orientation {} ({} to move{})",
        orientation,
        active_color,
        if manual.is_some() { ", manual" } else { "" }
    );

    let placement = match orientation {
        Orientation::Normal => placement,
        Orientation::Flipped => {
            let corrected = rotate(&placement);
            tracing::debug!("Corrected placement: {}", corrected);
            corrected
        }
    };

    Inference {
        placement,
        orientation,
        active_color,
    }
}

fn detect(placement: &PiecePlacement) -> (Orientation, ActiveColor) {
    let top = placement.top_rank();
    let bottom = placement.bottom_rank();
    let (top_white, top_black) = count_colors(&top);
    let (bottom_white, bottom_black) = count_colors(&bottom);
    tracing::debug!(
        "Back ranks: top {} (w={}, b={}), bottom {} (w={}, b={})",
        top,
        top_white,
        top_black,
        bottom,
        bottom_white,
        bottom_black
    );

    if bottom_white > bottom_black {
        (Orientation::Normal, ActiveColor::White)
    } else if bottom_black > bottom_white {
        (Orientation::Flipped, ActiveColor::Black)
    } else if bottom.contains(&['r', 'k', 'q'][..]) {
        (Orientation::Flipped, ActiveColor::Black)
    } else {
        (Orientation::Normal, ActiveColor::White)
    }
}

/// Count (upper-case, lower-case) piece letters in a rank string.
fn count_colors(rank: &str) -> (usize, usize) {
    let white = rank.chars().filter(|c| c.is_ascii_uppercase()).count();
    let black = rank.chars().filter(|c| c.is_ascii_lowercase()).count();
    (white, black)
}
