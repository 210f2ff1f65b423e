//! Offline replay tool
//!
//! Replays a file of match results into a fresh rating engine and prints the
//! resulting leaderboard. No network access is needed.
//!
//! Usage:
//!   cargo run --bin replay -- matches.json
//!   cargo run --bin replay -- matches.json --top 25 --output ratings.json
//!   cargo run --bin replay -- matches.json --config rating.toml --event-key 2024casj
//!
//! The input is a JSON array whose entries are either TBA `Match_Simple`
//! payloads (with `alliances`) or `push_results` entries (with `teams1`,
//! `teams2`, `score1`, `score2`). Both shapes may be mixed.

use alliance_rating::config::AppConfig;
use alliance_rating::engine::RatingEngine;
use alliance_rating::error::RatingError;
use alliance_rating::provider::TbaMatch;
use alliance_rating::rating::sequence;
use alliance_rating::snapshot::SnapshotFile;
use alliance_rating::types::{MatchRecord, SessionContext, SubmittedResult};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Replay a file of match results and print the resulting leaderboard")]
struct Cli {
    /// JSON file with an array of match results
    input: PathBuf,

    /// Number of leaderboard rows to print
    #[arg(short, long, default_value = "10")]
    top: usize,

    /// Write the resulting snapshot to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file whose rating section sets the environment
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Event key recorded in the snapshot context
    #[arg(long)]
    event_key: Option<String>,

    /// Season recorded in the snapshot context
    #[arg(long)]
    year: Option<i32>,
}

/// Decode one entry of the input array
fn decode_entry(entry: Value) -> Result<MatchRecord> {
    let record = if entry.get("alliances").is_some() {
        serde_json::from_value::<TbaMatch>(entry)?.into_record()
    } else if entry.get("teams1").is_some() || entry.get("teams2").is_some() {
        serde_json::from_value::<SubmittedResult>(entry)?.into()
    } else {
        return Err(RatingError::validation("entry has neither 'alliances' nor 'teams1'/'teams2'").into());
    };
    Ok(record)
}

/// Decode the whole input file; undecodable entries are reported and dropped
fn decode_matches(raw: &str) -> Result<Vec<MatchRecord>> {
    let value: Value = serde_json::from_str(raw).context("input is not valid JSON")?;
    let Value::Array(entries) = value else {
        return Err(RatingError::validation("input must be a JSON array of matches").into());
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match decode_entry(entry) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Dropping entry {}: {}", index, e),
        }
    }
    Ok(records)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    let engine = RatingEngine::new(config.rating.to_environment()?)?;

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let records = decode_matches(&raw)?;
    info!("Decoded {} match records from {}", records.len(), cli.input.display());

    let sequenced = sequence(&records);
    let context = SessionContext {
        event_key: cli.event_key.clone(),
        year: cli.year,
    };
    let summary = engine.rebuild_sequenced(&sequenced, context)?;

    println!(
        "Applied {} matches, skipped {}, {} teams rated",
        summary.applied, summary.skipped, summary.teams_indexed
    );
    println!();
    println!(
        "{:>4}  {:<10} {:>8} {:>8} {:>10} {:>8}",
        "#", "team", "mu", "sigma", "mu-3sigma", "conf%"
    );
    for (rank, team) in engine.leaderboard()?.iter().take(cli.top).enumerate() {
        println!(
            "{:>4}  {:<10} {:>8.3} {:>8.3} {:>10.3} {:>8.2}",
            rank + 1,
            team.team_key,
            team.mu,
            team.sigma,
            team.conservative_mu_3sigma,
            team.confidence_percent
        );
    }

    if let Some(output) = &cli.output {
        let snapshot = engine.export_snapshot()?;
        SnapshotFile::new(output.clone()).save(&snapshot)?;
        println!();
        println!("Snapshot written to {}", output.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alliance_rating::types::MatchResult;

    #[test]
    fn test_decodes_mixed_shapes() {
        let raw = r#"[
            {
                "key": "2024casj_qm1",
                "comp_level": "qm",
                "actual_time": 1711900000,
                "alliances": {
                    "red": {"team_keys": ["frc1", "frc2", "frc3"], "score": 40},
                    "blue": {"team_keys": ["frc4", "frc5", "frc6"], "score": 35}
                }
            },
            {"teams1": ["frc1"], "teams2": ["frc4"], "score1": 3, "score2": 3},
            {"unrelated": true}
        ]"#;

        let records = decode_matches(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].alliance_a, vec!["frc1", "frc2", "frc3"]);
        assert_eq!(records[0].timestamp, Some(1711900000));
        assert_eq!(
            records[1].result,
            MatchResult::Scores {
                score_a: Some(3.0),
                score_b: Some(3.0)
            }
        );
    }

    #[test]
    fn test_rejects_non_array_input() {
        assert!(decode_matches(r#"{"teams1": []}"#).is_err());
        assert!(decode_matches("not json").is_err());
    }
}
