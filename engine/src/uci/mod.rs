//! UCI wire format.

pub mod parser;

pub use parser::{format_uci_move, parse_uci_message, parse_uci_move, UciMessage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
}
