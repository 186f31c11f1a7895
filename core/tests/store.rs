//! File-backed persistence: games survive a reopen, and two connections
//! to the same database serialize through the optimistic version check.

use chrono::NaiveDate;
use ledgerlife_core::config::GameConfig;
use ledgerlife_core::error::GameError;
use ledgerlife_core::processor::{ActionProcessor, NewGame};
use ledgerlife_core::store::GameStore;
use std::path::PathBuf;

const GAME: &str = "game-1";

fn temp_db(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ledgerlife-{}-{}.db", name, std::process::id()))
}

fn cleanup(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let mut p = path.clone();
        p.set_file_name(format!(
            "{}{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            suffix
        ));
        let _ = std::fs::remove_file(p);
    }
}

fn seed_game(store: GameStore) -> ActionProcessor {
    let processor = ActionProcessor::new(store, GameConfig::default_test());
    processor
        .create_game(&NewGame {
            game_id: GAME.to_string(),
            user_id: "user-1".to_string(),
            persona: "adult".to_string(),
            difficulty: "normal".to_string(),
            region: "us".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            seed: "store-seed".to_string(),
        })
        .unwrap();
    processor
}

#[test]
fn a_game_survives_closing_and_reopening_the_database() {
    let path = temp_db("persist");
    cleanup(&path);
    let store = GameStore::open(path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();
    let processor = seed_game(store);
    let before = processor.store().load_game(GAME).unwrap();

    let reopened = processor.store().reopen().unwrap();
    let after = reopened.load_game(GAME).unwrap();
    assert_eq!(after.net_worth, before.net_worth);
    assert_eq!(after.version, before.version);
    assert_eq!(after.entity_seq, before.entity_seq);

    // Starter bills landed with onboarding: rent, utilities, phone.
    let bills = reopened.bills(GAME).unwrap();
    assert_eq!(bills.len(), 3);
    assert_eq!(bills.iter().map(|b| b.amount).sum::<i64>(), 133_000);
    assert!(bills.iter().all(|b| b.autopay));
    let first_of_next_month = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    assert!(bills.iter().all(|b| b.next_due_on == first_of_next_month));

    cleanup(&path);
}

#[test]
fn a_stale_writer_hits_a_retryable_version_conflict() {
    let path = temp_db("conflict");
    cleanup(&path);
    let store = GameStore::open(path.to_str().unwrap()).unwrap();
    store.migrate().unwrap();
    let processor = seed_game(store);

    let second = processor.store().reopen().unwrap();
    let stale = second.load_game(GAME).unwrap();

    // First writer commits against the loaded version.
    let fresh = processor.store().load_game(GAME).unwrap();
    processor.store().update_game(&fresh).unwrap();

    // The second writer still holds the old version and must lose.
    let err = second.update_game(&stale).unwrap_err();
    assert!(matches!(err, GameError::VersionConflict { .. }));
    assert_eq!(err.code(), "INTERNAL_ERROR");
    assert!(err.is_retryable());

    cleanup(&path);
}
