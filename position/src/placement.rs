//! Piece-placement field parsing.
//!
//! Vision classifiers emit one `1` per empty tile (`11P11111`), while FEN
//! wants empty runs compressed (`2P5`). Both forms parse; rendering always
//! produces the compressed form.

use std::fmt;

const PIECE_LETTERS: &str = "pnbrqkPNBRQK";

/// An 8x8 piece placement, stored top row first as supplied by the vision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiecePlacement {
    rows: [[Option<char>; 8]; 8],
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {rank} covers {squares} squares instead of 8")]
    RankWidth { rank: usize, squares: usize },
    #[error("invalid character {ch:?} in rank {rank}")]
    InvalidChar { rank: usize, ch: char },
}

impl PiecePlacement {
    /// Parse a placement field. A trailing FEN game-state suffix is ignored.
    pub fn parse(s: &str) -> Result<Self, PlacementError> {
        let field = s.split_whitespace().next().unwrap_or("");
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(PlacementError::RankCount(ranks.len()));
        }

        let mut rows = [[None; 8]; 8];
        for (idx, rank) in ranks.iter().enumerate() {
            let mut file = 0usize;
            for ch in rank.chars() {
                if let Some(skip) = ch.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    file += skip as usize;
                } else if PIECE_LETTERS.contains(ch) {
                    if file < 8 {
                        rows[idx][file] = Some(ch);
                    }
                    file += 1;
                } else {
                    return Err(PlacementError::InvalidChar { rank: idx, ch });
                }
            }
            if file != 8 {
                return Err(PlacementError::RankWidth {
                    rank: idx,
                    squares: file,
                });
            }
        }

        Ok(Self { rows })
    }

    /// Compressed rank string for row `idx` (0 = top of the image).
    pub fn rank(&self, idx: usize) -> String {
        let mut out = String::new();
        let mut empty = 0u8;
        for square in &self.rows[idx] {
            match square {
                Some(ch) => {
                    if empty > 0 {
                        out.push((b'0' + empty) as char);
                        empty = 0;
                    }
                    out.push(*ch);
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push((b'0' + empty) as char);
        }
        out
    }

    pub fn top_rank(&self) -> String {
        self.rank(0)
    }

    pub fn bottom_rank(&self) -> String {
        self.rank(7)
    }

    /// The same placement turned 180 degrees.
    pub fn rotated(&self) -> Self {
        let mut rows = self.rows;
        rows.reverse();
        for row in rows.iter_mut() {
            row.reverse();
        }
        Self { rows }
    }
}

impl fmt::Display for PiecePlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..8 {
            if idx > 0 {
                f.write_str("/")?;
            }
            f.write_str(&self.rank(idx))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for PiecePlacement {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Rotate a placement string by 180 degrees: reverse the rank order and the
/// characters inside each rank.
///
/// Works on the raw text, so it applies to malformed input too and is its
/// own inverse for every string.
pub fn rotate(placement: &str) -> String {
    placement
        .split('/')
        .rev()
        .map(|rank| rank.chars().rev().collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

    #[test]
    fn test_parse_starting_position() {
        let p = PiecePlacement::parse(START).unwrap();
        assert_eq!(p.to_string(), START);
        assert_eq!(p.top_rank(), "rnbqkbnr");
        assert_eq!(p.bottom_rank(), "RNBQKBNR");
        assert_eq!(p.rank(4), "8");
    }

    #[test]
    fn test_parse_expanded_empty_runs() {
        let p = PiecePlacement::parse(
            "rnbqkbnr/pppppppp/11111111/11111111/1111P111/11111111/PPPP1PPP/RNBQKBNR",
        )
        .unwrap();
        assert_eq!(
            p.to_string(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"
        );
    }

    #[test]
    fn test_parse_ignores_game_state_suffix() {
        let p = PiecePlacement::parse("8/8/8/8/8/8/8/K6k w - - 0 1").unwrap();
        assert_eq!(p.bottom_rank(), "K6k");
    }

    #[test]
    fn test_rank_count_error() {
        assert_eq!(
            PiecePlacement::parse("8/8/8"),
            Err(PlacementError::RankCount(3))
        );
    }

    #[test]
    fn test_rank_width_error() {
        assert_eq!(
            PiecePlacement::parse("8/8/8/8/8/8/8/K7k"),
            Err(PlacementError::RankWidth {
                rank: 7,
                squares: 9
            })
        );
        assert!(matches!(
            PiecePlacement::parse("7/8/8/8/8/8/8/8"),
            Err(PlacementError::RankWidth { rank: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_char_error() {
        assert_eq!(
            PiecePlacement::parse("8/8/8/8/8/8/8/7x"),
            Err(PlacementError::InvalidChar { rank: 7, ch: 'x' })
        );
        assert!(matches!(
            PiecePlacement::parse("8/8/8/8/8/8/8/09"),
            Err(PlacementError::InvalidChar { .. })
        ));
    }

    #[test]
    fn test_rotate_string() {
        assert_eq!(
            rotate(START),
            "RNBKQBNR/PPPPPPPP/8/8/8/8/pppppppp/rnbkqbnr"
        );
        assert_eq!(rotate("3P4/8/8/8/8/8/8/8"), "8/8/8/8/8/8/8/4P3");
    }

    #[test]
    fn test_rotate_matches_grid_rotation() {
        let p = PiecePlacement::parse("r3k2r/8/8/3p4/8/2N5/8/R3K2R").unwrap();
        assert_eq!(rotate(&p.to_string()), p.rotated().to_string());
    }

    fn arb_placement() -> impl Strategy<Value = String> {
        let square = prop::sample::select(vec![
            None,
            None,
            None,
            Some('p'),
            Some('n'),
            Some('b'),
            Some('r'),
            Some('q'),
            Some('k'),
            Some('P'),
            Some('N'),
            Some('B'),
            Some('R'),
            Some('Q'),
            Some('K'),
        ]);
        prop::collection::vec(prop::collection::vec(square, 8), 8).prop_map(|rows| {
            let ranks: Vec<String> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|sq| sq.unwrap_or('1'))
                        .collect::<String>()
                })
                .collect();
            PiecePlacement::parse(&ranks.join("/"))
                .map(|p| p.to_string())
                .unwrap_or_default()
        })
    }

    proptest! {
        #[test]
        fn prop_rotate_twice_is_identity(p in arb_placement()) {
            prop_assert_eq!(rotate(&rotate(&p)), p);
        }

        #[test]
        fn prop_rotated_placement_stays_well_formed(p in arb_placement()) {
            let parsed = PiecePlacement::parse(&p).unwrap();
            let rotated = PiecePlacement::parse(&rotate(&p)).unwrap();
            prop_assert_eq!(rotated, parsed.rotated());
        }

        #[test]
        fn prop_rotate_twice_on_arbitrary_text(s in "[a-zA-Z0-9/]{0,40}") {
            prop_assert_eq!(rotate(&rotate(&s)), s);
        }
    }
}
