//! Side-to-move and board orientation types.

use serde::{Deserialize, Serialize};

/// The side whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveColor {
    White,
    Black,
}

/// Which physical edge of the captured image holds rank 1.
///
/// `Normal` means the bottom row of the image is White's back rank,
/// `Flipped` means it is Black's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Normal,
    Flipped,
}

impl ActiveColor {
    /// FEN side-to-move token.
    pub fn fen_token(self) -> &'static str {
        match self {
            Self::White => "w",
            Self::Black => "b",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }

    /// Parse a side token such as `w`, `b`, `white` or `black`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "w" | "white" => Some(Self::White),
            "b" | "black" => Some(Self::Black),
            _ => None,
        }
    }
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Flipped => "flipped",
        }
    }
}

impl std::fmt::Display for ActiveColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActiveColor> for cozy_chess::Color {
    fn from(c: ActiveColor) -> Self {
        match c {
            ActiveColor::White => cozy_chess::Color::White,
            ActiveColor::Black => cozy_chess::Color::Black,
        }
    }
}

impl From<cozy_chess::Color> for ActiveColor {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_tokens() {
        assert_eq!(ActiveColor::White.fen_token(), "w");
        assert_eq!(ActiveColor::Black.fen_token(), "b");
    }

    #[test]
    fn test_opposite() {
        assert_eq!(ActiveColor::White.opposite(), ActiveColor::Black);
        assert_eq!(ActiveColor::Black.opposite().opposite(), ActiveColor::Black);
    }

    #[test]
    fn test_from_token() {
        assert_eq!(ActiveColor::from_token("W"), Some(ActiveColor::White));
        assert_eq!(ActiveColor::from_token("black"), Some(ActiveColor::Black));
        assert_eq!(ActiveColor::from_token("x"), None);
    }
}
