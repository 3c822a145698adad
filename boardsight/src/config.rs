//! Configuration for the boardsight runtime.
//!
//! Engine location and response timeout come from environment variables
//! with compile-time defaults. Playing strength is chosen on the command
//! line, either as a named preset or as a target rating.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on any single wait for engine output (in seconds).
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

/// Lowest and highest rating accepted by `--elo`.
pub const MIN_ELO: u16 = 800;
pub const MAX_ELO: u16 = 3200;

/// Rating points per skill level above [`MIN_ELO`].
const ELO_PER_SKILL_LEVEL: u16 = 120;

/// Get an explicit Stockfish path.
///
/// Priority:
/// 1. `BOARDSIGHT_STOCKFISH_PATH` env variable if set
/// 2. `None`, letting the engine search the usual install locations
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var("BOARDSIGHT_STOCKFISH_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Get the engine response timeout in seconds.
///
/// Priority:
/// 1. `BOARDSIGHT_ENGINE_TIMEOUT_SECS` env variable if set (falls back to
///    the default if the value cannot be parsed as a `u64`)
/// 2. `30` seconds as fallback
pub fn get_engine_timeout_secs() -> u64 {
    if let Ok(timeout) = std::env::var("BOARDSIGHT_ENGINE_TIMEOUT_SECS") {
        return timeout.parse().unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);
    }

    DEFAULT_ENGINE_TIMEOUT_SECS
}

pub fn get_engine_timeout() -> Duration {
    Duration::from_secs(get_engine_timeout_secs())
}

/// Named strength presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strength {
    Beginner,
    Casual,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Strength {
    pub fn skill_level(self) -> u8 {
        match self {
            Self::Beginner => 0,
            Self::Casual => 3,
            Self::Intermediate => 6,
            Self::Advanced => 10,
            Self::Expert => 15,
            Self::Master => 20,
        }
    }
}

/// Map a rating to a Stockfish skill level (0-20).
pub fn skill_for_elo(elo: u16) -> u8 {
    let above = elo.saturating_sub(MIN_ELO) / ELO_PER_SKILL_LEVEL;
    above.min(20) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_stockfish_path() {
        let path = get_stockfish_path();
        match std::env::var("BOARDSIGHT_STOCKFISH_PATH") {
            Ok(val) if !val.is_empty() => assert_eq!(path, Some(PathBuf::from(val))),
            _ => assert_eq!(path, None),
        }
    }

    #[test]
    fn test_get_engine_timeout_secs_default() {
        if std::env::var("BOARDSIGHT_ENGINE_TIMEOUT_SECS").is_err() {
            assert_eq!(get_engine_timeout_secs(), DEFAULT_ENGINE_TIMEOUT_SECS);
            assert_eq!(get_engine_timeout(), Duration::from_secs(30));
        }
    }

    #[test]
    fn test_skill_for_elo() {
        assert_eq!(skill_for_elo(800), 0);
        assert_eq!(skill_for_elo(919), 0);
        assert_eq!(skill_for_elo(920), 1);
        assert_eq!(skill_for_elo(1600), 6);
        assert_eq!(skill_for_elo(2000), 10);
        assert_eq!(skill_for_elo(3200), 20);
        assert_eq!(skill_for_elo(500), 0);
        assert_eq!(skill_for_elo(u16::MAX), 20);
    }

    #[test]
    fn test_presets_are_ordered() {
        let presets = [
            Strength::Beginner,
            Strength::Casual,
            Strength::Intermediate,
            Strength::Advanced,
            Strength::Expert,
            Strength::Master,
        ];
        for pair in presets.windows(2) {
            assert!(pair[0].skill_level() < pair[1].skill_level());
        }
        assert_eq!(Strength::Beginner.skill_level(), 0);
        assert_eq!(Strength::Master.skill_level(), 20);
    }
}
