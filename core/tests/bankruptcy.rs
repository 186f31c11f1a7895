//! The solvency state machine: stress stages, bankruptcy entry with
//! account freezing, and recovery-window exit.

use chrono::NaiveDate;
use ledgerlife_core::action::GameAction;
use ledgerlife_core::config::GameConfig;
use ledgerlife_core::formulas::BankruptcyStage;
use ledgerlife_core::game::AccountStatus;
use ledgerlife_core::processor::{ActionProcessor, NewGame};
use ledgerlife_core::store::GameStore;

const GAME: &str = "game-1";
const CHECKING: &str = "acct-000001";
const CREDIT_CARD: &str = "acct-000003";

fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default_test();
    config.event_curves.clear();
    config.card_templates.clear();
    config.tax.min_level = u32::MAX; // quiet the April 15 tax card
    config
}

fn setup() -> ActionProcessor {
    let store = GameStore::in_memory().unwrap();
    store.migrate().unwrap();
    let processor = ActionProcessor::new(store, quiet_config());
    processor
        .create_game(&NewGame {
            game_id: GAME.to_string(),
            user_id: "user-1".to_string(),
            persona: "adult".to_string(),
            difficulty: "normal".to_string(),
            region: "us".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            seed: "solvency-seed".to_string(),
        })
        .unwrap();
    processor
}

fn advance_days(p: &ActionProcessor, days: u32, now: &mut i64) {
    for _ in 0..days {
        let result = p.process_at(GAME, &GameAction::AdvanceDay, *now);
        assert!(result.success, "{:?}", result.errors);
        *now += 86_400;
    }
}

#[test]
fn mild_debt_surfaces_as_a_stress_stage() {
    let p = setup();
    let mut now = 1_700_000_000i64;
    // Net worth -1_000_000 against 350_000/month income: after January's
    // salary that is roughly -1.9x income, inside the stress band.
    p.store().update_balance(GAME, CHECKING, -1_200_000).unwrap();

    advance_days(&p, 31, &mut now);
    let game = p.store().load_game(GAME).unwrap();
    assert_eq!(game.bankruptcy_stage, BankruptcyStage::FinancialStress);
    assert_eq!(
        p.store().event_count(GAME, "bankruptcy_stage_changed").unwrap(),
        1
    );
    // Stress is a warning, not bankruptcy: nothing frozen.
    let cc = p.store().get_account(GAME, CREDIT_CARD).unwrap();
    assert_eq!(cc.status, AccountStatus::Active);
}

#[test]
fn sustained_deep_insolvency_triggers_bankruptcy() {
    let p = setup();
    let mut now = 1_700_000_000i64;
    p.store().update_balance(GAME, CHECKING, -5_200_000).unwrap();

    // Three month-ends underwater (Jan, Feb, Mar).
    advance_days(&p, 31 + 29 + 31, &mut now);
    let game = p.store().load_game(GAME).unwrap();
    assert_eq!(game.date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    assert_eq!(game.bankruptcy_stage, BankruptcyStage::Bankrupt);
    assert_eq!(game.bankruptcy_count, 1);
    assert_eq!(game.chi, 300);
    assert_eq!(
        game.bankrupt_until,
        Some(NaiveDate::from_ymd_opt(2024, 6, 29).unwrap())
    );

    let cc = p.store().get_account(GAME, CREDIT_CARD).unwrap();
    assert_eq!(cc.status, AccountStatus::Frozen);
    assert_eq!(p.store().event_count(GAME, "bankruptcy_entered").unwrap(), 1);
}

#[test]
fn recovery_exits_after_positive_months_and_the_window() {
    let p = setup();
    let mut now = 1_700_000_000i64;
    p.store().update_balance(GAME, CHECKING, -5_200_000).unwrap();
    advance_days(&p, 31 + 29 + 31, &mut now);
    assert!(p.store().load_game(GAME).unwrap().is_bankrupt());

    // A windfall flips net worth positive; the stage still holds until
    // both the positive-month count and the 90-day window are met.
    p.store().update_balance(GAME, CHECKING, 10_000_000).unwrap();

    // April and May month-ends: two positive months, but May 31 is
    // still inside the window ending Jun 29.
    advance_days(&p, 30 + 31, &mut now);
    assert!(p.store().load_game(GAME).unwrap().is_bankrupt());

    // June's month-end (Jun 30) clears both gates.
    advance_days(&p, 30, &mut now);
    let game = p.store().load_game(GAME).unwrap();
    assert_eq!(game.bankruptcy_stage, BankruptcyStage::Normal);
    assert_eq!(game.bankrupt_until, None);
    assert_eq!(p.store().event_count(GAME, "bankruptcy_exited").unwrap(), 1);

    let cc = p.store().get_account(GAME, CREDIT_CARD).unwrap();
    assert_eq!(cc.status, AccountStatus::Active);
    // The count records history even after a clean exit.
    assert_eq!(game.bankruptcy_count, 1);
}
