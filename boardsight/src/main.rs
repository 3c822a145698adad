//! boardsight CLI - recommend a move for a chessboard read off a screenshot.
//!
//! Each positional argument is the piece placement produced by the vision
//! step for one screenshot, top rank of the image first. Every placement is
//! analysed as an independent cycle against a single engine process:
//!
//! 1. Infer orientation and side to move from the bottom rank.
//! 2. Repair the placement into a FEN the engine accepts.
//! 3. Query the engine, restarting it once and falling back to a single
//!    best move if it misbehaves.
//! 4. Print the recommendation, optionally mapped onto image pixels.
//!
//! Engine tunables that are not flags live in [`config`].

use anyhow::Context;
use clap::Parser;
use engine::{EngineConfig, EngineQueryManager, StockfishLauncher};
use position::{ActiveColor, BoardCorners};
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;

use config::Strength;
use pipeline::{analyze, render, BoardReading};

#[derive(Parser)]
#[command(name = "boardsight", about = "Best-move recommendations from board screenshots")]
struct Cli {
    /// Piece placements as read from the image (e.g. `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR`).
    #[arg(required = true)]
    placements: Vec<String>,

    /// Side to move, overriding detection. `b` also means Black sits at the
    /// bottom of the image.
    #[arg(long, value_parser = parse_side)]
    side: Option<ActiveColor>,

    /// Named strength preset.
    #[arg(long, value_enum, conflicts_with_all = ["elo", "skill"])]
    strength: Option<Strength>,

    /// Target rating, mapped onto a skill level.
    #[arg(
        long,
        value_parser = clap::value_parser!(u16).range(i64::from(config::MIN_ELO)..=i64::from(config::MAX_ELO)),
        conflicts_with = "skill"
    )]
    elo: Option<u16>,

    /// Stockfish skill level.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=20))]
    skill: Option<u8>,

    /// Search depth.
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=20))]
    depth: u8,

    /// Number of ranked candidates to request.
    #[arg(long, default_value_t = 3)]
    top: usize,

    /// Engine search threads (clamped to 1-16).
    #[arg(long)]
    threads: Option<u32>,

    /// Engine hash table size in MB (clamped to 1-2048).
    #[arg(long)]
    hash: Option<u32>,

    /// Board bounding box in the image, `x0,y0,x1,y1`.
    #[arg(long)]
    corners: Option<BoardCorners>,

    /// Comma-separated tile classifier confidences.
    #[arg(long, value_delimiter = ',')]
    confidences: Vec<f32>,

    /// Print JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn parse_side(s: &str) -> Result<ActiveColor, String> {
    ActiveColor::from_token(s).ok_or_else(|| format!("expected w or b, got {:?}", s))
}

impl Cli {
    fn skill_level(&self) -> u8 {
        match (self.strength, self.elo, self.skill) {
            (Some(strength), _, _) => strength.skill_level(),
            (None, Some(elo), _) => config::skill_for_elo(elo),
            (None, None, Some(skill)) => skill,
            (None, None, None) => Strength::Advanced.skill_level(),
        }
    }

    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut engine_config = EngineConfig::new(self.skill_level(), self.depth)?
            .with_top_moves(self.top)
            .with_timeout(config::get_engine_timeout());
        if let Some(threads) = self.threads {
            engine_config = engine_config.with_threads(threads);
        }
        if let Some(hash_mb) = self.hash {
            engine_config = engine_config.with_hash_mb(hash_mb);
        }
        if let Some(path) = config::get_stockfish_path() {
            engine_config = engine_config.with_path(path);
        }
        Ok(engine_config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for --json.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine_config = cli.engine_config()?;
    tracing::info!(
        "Engine skill {} at depth {}",
        engine_config.skill_level(),
        engine_config.depth()
    );

    let mut manager = EngineQueryManager::start(StockfishLauncher, engine_config)
        .await
        .context("could not start chess engine")?;

    let mut failures = 0usize;
    for (i, placement) in cli.placements.iter().enumerate() {
        let reading = BoardReading {
            placement: placement.clone(),
            confidences: cli.confidences.clone(),
            corners: cli.corners,
        };

        match analyze(&mut manager, &reading, cli.side).await {
            Ok(analysis) if cli.json => println!("{}", serde_json::to_string_pretty(&analysis)?),
            Ok(analysis) => {
                if cli.placements.len() > 1 {
                    println!("[{}] {}", i + 1, placement);
                }
                print!("{}", render(&analysis));
            }
            Err(e) => {
                tracing::error!("Analysis of {} failed: {}", placement, e);
                failures += 1;
            }
        }
    }

    manager.shutdown().await;

    if failures > 0 {
        anyhow::bail!("{} of {} positions could not be analysed", failures, cli.placements.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["boardsight", "8/8/8/8/8/8/8/8"]).unwrap();
        assert_eq!(cli.depth, 6);
        assert_eq!(cli.top, 3);
        assert_eq!(cli.side, None);
        assert_eq!(cli.skill_level(), 10);
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_strength_and_elo() {
        let cli = Cli::try_parse_from(["boardsight", "--strength", "casual", "x"]).unwrap();
        assert_eq!(cli.skill_level(), 3);

        let cli = Cli::try_parse_from(["boardsight", "--elo", "1600", "x"]).unwrap();
        assert_eq!(cli.skill_level(), 6);

        assert!(Cli::try_parse_from(["boardsight", "--elo", "500", "x"]).is_err());
        assert!(Cli::try_parse_from(["boardsight", "--strength", "master", "--skill", "3", "x"]).is_err());
    }

    #[test]
    fn test_cli_side_and_corners() {
        let cli = Cli::try_parse_from([
            "boardsight",
            "--side",
            "b",
            "--corners",
            "10,20,810,820",
            "--confidences",
            "0.9,0.8",
            "a",
            "b",
        ])
        .unwrap();
        assert_eq!(cli.side, Some(ActiveColor::Black));
        assert_eq!(cli.corners, Some(BoardCorners::new(10.0, 20.0, 810.0, 820.0)));
        assert_eq!(cli.confidences, vec![0.9, 0.8]);
        assert_eq!(cli.placements.len(), 2);

        assert!(Cli::try_parse_from(["boardsight", "--side", "x", "a"]).is_err());
    }

    #[test]
    fn test_engine_config_from_cli() {
        let cli = Cli::try_parse_from(["boardsight", "--skill", "20", "--depth", "12", "--top", "5", "x"]).unwrap();
        let config = cli.engine_config().unwrap();
        assert_eq!(config.skill_level(), 20);
        assert_eq!(config.depth(), 12);
        assert_eq!(config.top_moves(), 5);
        assert_eq!(config.threads(), None);
        assert_eq!(config.hash_mb(), None);
    }

    #[test]
    fn test_threads_and_hash_reach_engine_config() {
        let cli = Cli::try_parse_from(["boardsight", "--threads", "4", "--hash", "256", "x"]).unwrap();
        let config = cli.engine_config().unwrap();
        assert_eq!(config.threads(), Some(4));
        assert_eq!(config.hash_mb(), Some(256));
    }
}
