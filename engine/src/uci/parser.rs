use crate::{EngineInfo, Score, UciError};
use cozy_chess::Move;

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent when there is no legal move.
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    Info(EngineInfo),
}

/// Parse one line of engine output.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let mut tokens = line.split_whitespace();
    let malformed = || UciError::MalformedMessage(line.to_string());

    match tokens.next() {
        Some("uciok") => Ok(UciMessage::UciOk),
        Some("readyok") => Ok(UciMessage::ReadyOk),
        Some("id") => {
            let name = tokens.next().ok_or_else(malformed)?.to_string();
            let value = tokens.collect::<Vec<_>>().join(" ");
            if value.is_empty() {
                return Err(malformed());
            }
            Ok(UciMessage::Id { name, value })
        }
        Some("bestmove") => {
            let mv = match tokens.next().ok_or_else(malformed)? {
                "(none)" | "0000" => None,
                token => Some(parse_uci_move(token)?),
            };
            let ponder = match (tokens.next(), tokens.next()) {
                (Some("ponder"), Some(p)) => parse_uci_move(p).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }
        Some("info") => Ok(UciMessage::Info(parse_info(tokens))),
        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Fields after `info`. Unknown keywords are skipped; `string` swallows the
/// rest of the line.
fn parse_info<'a>(tokens: impl Iterator<Item = &'a str>) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut tokens = tokens.peekable();

    while let Some(keyword) = tokens.next() {
        match keyword {
            "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
            "multipv" => info.multipv = tokens.next().and_then(|v| v.parse().ok()),
            "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
            "score" => {
                let kind = tokens.next();
                let value = tokens.next().and_then(|v| v.parse().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
            }
            "pv" => {
                while let Some(mv) = tokens.next_if(|t| !is_keyword(t)) {
                    if let Ok(mv) = parse_uci_move(mv) {
                        info.pv.push(mv);
                    }
                }
            }
            "string" => break,
            _ => {}
        }
    }

    info
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

/// Parse a coordinate move (`e2e4`, `e7e8q`).
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    if !(4..=5).contains(&s.len()) {
        return Err(UciError::InvalidMove(s.to_string()));
    }
    s.parse().map_err(|_| UciError::InvalidMove(s.to_string()))
}

/// Coordinate notation for a move, as UCI expects it.
pub fn format_uci_move(mv: &Move) -> String {
    mv.to_string()
}
