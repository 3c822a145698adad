//! Position handling for boardsight.
//!
//! Takes the piece placement read off a board image, works out which side
//! is to move and which edge of the image is rank 1, and repairs the result
//! into a full FEN string that a validator accepts. Also maps squares back
//! to image pixels for annotation.

pub mod geometry;
pub mod orientation;
pub mod placement;
pub mod repair;
pub mod types;

pub use geometry::{arrowhead, move_to_pixels, square_center, square_to_pixel, BoardCorners, Pixel};
pub use orientation::{infer, Inference};
pub use placement::{rotate, PiecePlacement, PlacementError};
pub use repair::{
    candidates, repair, CandidateFen, CandidateKind, FenValidator, LegalityValidator, RepairError,
    RepairedFen,
};
pub use types::{ActiveColor, Orientation};

/// Standard starting position, used as a known-good FEN.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
