//! Concurrency tests for the rating engine and service
//!
//! Readers run while writers apply batches; every reader must observe either
//! the state before a batch or the state after it, never a mix.

mod fixtures;

use alliance_rating::engine::RatingEngine;
use alliance_rating::rating::RatingEnvironment;
use alliance_rating::service::RebuildSource;
use alliance_rating::types::{MatchRecord, SessionContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fixtures::{test_app, ScriptedProvider};

const WRITERS: usize = 4;
const BATCHES_PER_WRITER: usize = 25;

/// Two matches that introduce four new teams at once
fn batch(writer: usize, index: usize) -> Vec<MatchRecord> {
    let key = |slot: usize| format!("frc{}{:03}{}", writer + 1, index, slot);
    vec![
        MatchRecord::scored([key(0)], [key(1)], 10.0, 4.0),
        MatchRecord::scored([key(2)], [key(3)], 7.0, 7.0),
    ]
}

#[test]
fn test_readers_never_see_partial_batches() {
    let engine = Arc::new(RatingEngine::new(RatingEnvironment::default()).unwrap());
    let writers_done = Arc::new(AtomicBool::new(false));
    let start = Instant::now();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            let writers_done = writers_done.clone();
            thread::spawn(move || {
                let mut observations = 0usize;
                loop {
                    let finished = writers_done.load(Ordering::Acquire);

                    let leaderboard = engine.leaderboard().unwrap();
                    assert_eq!(leaderboard.len() % 4, 0, "partial batch visible");

                    let snapshot = engine.export_snapshot().unwrap();
                    assert_eq!(snapshot.teams.len() % 4, 0, "partial batch exported");
                    observations += 1;

                    if finished {
                        break observations;
                    }
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let engine = engine.clone();
            thread::spawn(move || {
                for index in 0..BATCHES_PER_WRITER {
                    let summary = engine.push_incremental(&batch(writer, index)).unwrap();
                    assert_eq!(summary.applied, 2);
                    assert_eq!(summary.teams_indexed % 4, 0);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    writers_done.store(true, Ordering::Release);

    let observations: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();
    assert!(observations > 0);
    assert_eq!(engine.team_count().unwrap(), WRITERS * BATCHES_PER_WRITER * 4);

    // Generous bound; a deadlock would hang far longer than this
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[test]
fn test_concurrent_predictions_materialise_each_team_once() {
    let engine = Arc::new(RatingEngine::new(RatingEnvironment::default()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let alliance_a = vec!["frc1".to_string(), format!("frc{}", 100 + i)];
                    let alliance_b = vec!["frc2".to_string(), "frc3".to_string()];
                    let prediction = engine.predict(&alliance_a, &alliance_b).unwrap();
                    assert!((prediction.win_probability_a - 0.5).abs() < 1e-12);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // frc1..frc3 plus one extra team per thread, all still at the prior
    assert_eq!(engine.team_count().unwrap(), 3 + 8);
    let prior = RatingEnvironment::default().prior();
    for team in engine.leaderboard().unwrap() {
        assert_eq!(team.mu, prior.mu);
        assert_eq!(team.sigma, prior.sigma);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rebuild_is_atomic_for_readers() {
    let dir = tempfile::tempdir().unwrap();

    // Expected end state from an identical, uncontended rebuild
    let reference_dir = tempfile::tempdir().unwrap();
    let reference = test_app(Arc::new(ScriptedProvider::new(2024, 5)), reference_dir.path());
    reference.rebuild(RebuildSource::Season(2024)).await.unwrap();
    let after = reference.leaderboard().unwrap();

    let app = Arc::new(test_app(Arc::new(ScriptedProvider::new(2024, 5)), dir.path()));
    app.engine()
        .rebuild_from(
            &[MatchRecord::scored(["frc1", "frc2"], ["frc3", "frc4"], 3.0, 1.0)],
            SessionContext::default(),
        )
        .unwrap();
    let before = app.leaderboard().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let app = app.clone();
            let done = done.clone();
            let before = before.clone();
            let after = after.clone();
            tokio::task::spawn_blocking(move || {
                while !done.load(Ordering::Acquire) {
                    let seen = app.leaderboard().unwrap();
                    assert!(seen == before || seen == after, "reader saw a mixed state");
                }
            })
        })
        .collect();

    app.rebuild(RebuildSource::Season(2024)).await.unwrap();
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(app.leaderboard().unwrap(), after);
}
