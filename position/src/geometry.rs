//! Square to image-pixel mapping for move annotation.
//!
//! Annotation is best effort, so every function returns `None` on bad input
//! instead of failing.

use serde::{Deserialize, Serialize};

const ARROWHEAD_LENGTH: f64 = 20.0;
const ARROWHEAD_HALF_ANGLE: f64 = 0.5;

/// Axis-aligned bounding box of the board in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardCorners {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl BoardCorners {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn square_width(&self) -> f64 {
        (self.x1 - self.x0) / 8.0
    }

    pub fn square_height(&self) -> f64 {
        (self.y1 - self.y0) / 8.0
    }
}

impl std::str::FromStr for BoardCorners {
    type Err = String;

    /// Parse `x0,y0,x1,y1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid corner value in {:?}: {}", s, e))?;
        match values.as_slice() {
            [x0, y0, x1, y1] => Ok(Self::new(*x0, *y0, *x1, *y1)),
            _ => Err(format!("expected x0,y0,x1,y1, got {:?}", s)),
        }
    }
}

/// Pixel center of the square at `file` (0 = a) and `rank` (0 = rank 1).
///
/// Image y grows downward, so rank 1 sits at the bottom of the box.
pub fn square_center(file: u8, rank: u8, corners: &BoardCorners) -> Option<Pixel> {
    if file > 7 || rank > 7 {
        return None;
    }
    let x = corners.x0 + (f64::from(file) + 0.5) * corners.square_width();
    let y = corners.y1 - (f64::from(rank) + 0.5) * corners.square_height();
    Some(Pixel {
        x: x as i32,
        y: y as i32,
    })
}

/// Pixel center of a square given in algebraic notation such as `e4`.
pub fn square_to_pixel(square: &str, corners: &BoardCorners) -> Option<Pixel> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].checked_sub(b'a').filter(|f| *f < 8)?;
    let rank = bytes[1].checked_sub(b'1').filter(|r| *r < 8)?;
    square_center(file, rank, corners)
}

/// Source and destination centers of a coordinate move (`e2e4`, `e7e8q`).
pub fn move_to_pixels(uci: &str, corners: &BoardCorners) -> Option<(Pixel, Pixel)> {
    if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
        return None;
    }
    let from = square_to_pixel(&uci[0..2], corners)?;
    let to = square_to_pixel(&uci[2..4], corners)?;
    Some((from, to))
}

/// Triangle for an arrowhead pointing at `to`: the tip followed by the left
/// and right barbs. `None` when the arrow has no length.
pub fn arrowhead(from: Pixel, to: Pixel) -> Option<[Pixel; 3]> {
    let dx = f64::from(to.x - from.x);
    let dy = f64::from(to.y - from.y);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return None;
    }
    let (dx, dy) = (dx / length, dy / length);
    let (sin, cos) = ARROWHEAD_HALF_ANGLE.sin_cos();
    let tip_x = f64::from(to.x);
    let tip_y = f64::from(to.y);

    let left = Pixel {
        x: (tip_x - ARROWHEAD_LENGTH * (dx * cos - dy * sin)) as i32,
        y: (tip_y - ARROWHEAD_LENGTH * (dy * cos + dx * sin)) as i32,
    };
    let right = Pixel {
        x: (tip_x - ARROWHEAD_LENGTH * (dx * cos + dy * sin)) as i32,
        y: (tip_y - ARROWHEAD_LENGTH * (dy * cos - dx * sin)) as i32,
    };
    Some([to, left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> BoardCorners {
        BoardCorners::new(0.0, 0.0, 800.0, 800.0)
    }

    #[test]
    fn test_e4_on_800px_board() {
        // file e = 4, rank 4 = 3, squares of 100px:
        // x = 0 + 4.5 * 100, y = 800 - 3.5 * 100
        assert_eq!(square_to_pixel("e4", &board()), Some(Pixel { x: 450, y: 450 }));
    }

    #[test]
    fn test_corner_squares() {
        assert_eq!(square_to_pixel("a1", &board()), Some(Pixel { x: 50, y: 750 }));
        assert_eq!(square_to_pixel("h8", &board()), Some(Pixel { x: 750, y: 50 }));
    }

    #[test]
    fn test_offset_board_truncates() {
        let corners = BoardCorners::new(10.0, 20.0, 110.0, 120.0);
        // Square size 12.5: x = 10 + 0.5 * 12.5 = 16.25, y = 120 - 0.5 * 12.5 = 113.75
        assert_eq!(square_to_pixel("a1", &corners), Some(Pixel { x: 16, y: 113 }));
    }

    #[test]
    fn test_invalid_squares() {
        assert_eq!(square_to_pixel("", &board()), None);
        assert_eq!(square_to_pixel("e", &board()), None);
        assert_eq!(square_to_pixel("e44", &board()), None);
        assert_eq!(square_to_pixel("i4", &board()), None);
        assert_eq!(square_to_pixel("e9", &board()), None);
        assert_eq!(square_to_pixel("e0", &board()), None);
        assert_eq!(square_to_pixel("E4", &board()), None);
        assert_eq!(square_center(8, 0, &board()), None);
    }

    #[test]
    fn test_move_to_pixels() {
        let (from, to) = move_to_pixels("e2e4", &board()).unwrap();
        assert_eq!(from, Pixel { x: 450, y: 650 });
        assert_eq!(to, Pixel { x: 450, y: 450 });
        assert!(move_to_pixels("e7e8q", &board()).is_some());
        assert_eq!(move_to_pixels("e2", &board()), None);
        assert_eq!(move_to_pixels("e2z4", &board()), None);
        assert_eq!(move_to_pixels("é2e4", &board()), None);
    }

    #[test]
    fn test_arrowhead_points_back_along_the_arrow() {
        let head = arrowhead(Pixel { x: 450, y: 650 }, Pixel { x: 450, y: 450 }).unwrap();
        assert_eq!(head[0], Pixel { x: 450, y: 450 });
        // Arrow points up, so both barbs sit below the tip, one either side.
        assert!(head[1].y > 450 && head[2].y > 450);
        assert!(head[1].x != head[2].x);
        assert_eq!(head[1].y, head[2].y);
    }

    #[test]
    fn test_arrowhead_zero_length() {
        let p = Pixel { x: 5, y: 5 };
        assert_eq!(arrowhead(p, p), None);
    }

    #[test]
    fn test_parse_corners() {
        let c: BoardCorners = "0, 0, 800,800".parse().unwrap();
        assert_eq!(c, board());
        assert!("1,2,3".parse::<BoardCorners>().is_err());
        assert!("a,b,c,d".parse::<BoardCorners>().is_err());
    }
}
