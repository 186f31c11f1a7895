//! Decision-card flow: presentation blocks the day, options apply their
//! cost and rewards, and consequence templates come back days later.

use chrono::NaiveDate;
use ledgerlife_core::action::{GameAction, RewardGrant};
use ledgerlife_core::config::GameConfig;
use ledgerlife_core::processor::{ActionProcessor, NewGame};
use ledgerlife_core::store::GameStore;

const GAME: &str = "game-1";
const CHECKING: &str = "acct-000001";

/// Only the friend-loan pair survives: `friend_loan` is the lone
/// selectable template (its consequence `friend_repays` has zero weight),
/// and the long recency window stops it from re-appearing.
fn loan_config() -> GameConfig {
    let mut config = GameConfig::default_test();
    config.event_curves.clear();
    config
        .card_templates
        .retain(|t| t.template_id == "friend_loan" || t.template_id == "friend_repays");
    config.card_recency_days = 365;
    config
}

fn setup() -> ActionProcessor {
    let store = GameStore::in_memory().unwrap();
    store.migrate().unwrap();
    let processor = ActionProcessor::new(store, loan_config());
    processor
        .create_game(&NewGame {
            game_id: GAME.to_string(),
            user_id: "user-1".to_string(),
            persona: "adult".to_string(),
            difficulty: "normal".to_string(),
            region: "us".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            seed: "card-seed".to_string(),
        })
        .unwrap();
    processor
}

#[test]
fn pending_card_blocks_day_advancement() {
    let p = setup();
    let mut now = 1_700_000_000i64;

    let result = p.process_at(GAME, &GameAction::AdvanceDay, now);
    assert!(result.success, "{:?}", result.errors);
    let pending = p.store().pending_cards(GAME).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].template_id, "friend_loan");

    now += 86_400;
    let result = p.process_at(GAME, &GameAction::AdvanceDay, now);
    assert!(!result.success);
    assert_eq!(result.errors[0].code, "PENDING_CARDS");
}

#[test]
fn unknown_option_is_rejected_and_card_stays_pending() {
    let p = setup();
    p.process_at(GAME, &GameAction::AdvanceDay, 1_700_000_000);
    let card_id = p.store().pending_cards(GAME).unwrap()[0].card_id.clone();

    let result = p.process(
        GAME,
        &GameAction::DecideCard {
            card_id: card_id.clone(),
            option_id: "not_an_option".into(),
        },
    );
    assert_eq!(result.errors[0].code, "INVALID_OPTION");
    assert_eq!(p.store().pending_cards(GAME).unwrap().len(), 1);

    let result = p.process(
        GAME,
        &GameAction::DecideCard {
            card_id: "card-999999".into(),
            option_id: "lend".into(),
        },
    );
    assert_eq!(result.errors[0].code, "CARD_NOT_FOUND");
}

#[test]
fn a_resolved_card_cannot_be_decided_again() {
    let p = setup();
    p.process_at(GAME, &GameAction::AdvanceDay, 1_700_000_000);
    let card_id = p.store().pending_cards(GAME).unwrap()[0].card_id.clone();

    let first = p.process(
        GAME,
        &GameAction::DecideCard {
            card_id: card_id.clone(),
            option_id: "decline".into(),
        },
    );
    assert!(first.success, "{:?}", first.errors);

    let second = p.process(
        GAME,
        &GameAction::DecideCard {
            card_id,
            option_id: "decline".into(),
        },
    );
    assert!(!second.success);
    assert_eq!(second.errors[0].code, "CARD_NOT_FOUND");
}

#[test]
fn first_decision_earns_the_badge() {
    let p = setup();
    p.process_at(GAME, &GameAction::AdvanceDay, 1_700_000_000);
    let card_id = p.store().pending_cards(GAME).unwrap()[0].card_id.clone();

    let result = p.process(
        GAME,
        &GameAction::DecideCard {
            card_id,
            option_id: "decline".into(),
        },
    );
    assert!(result.success, "{:?}", result.errors);
    assert!(result
        .rewards
        .iter()
        .any(|r| matches!(r, RewardGrant::Badge { badge_id } if badge_id == "first_decision")));
    assert_eq!(p.store().pending_cards(GAME).unwrap().len(), 0);
}

#[test]
fn lending_schedules_a_repayment_card() {
    let p = setup();
    let mut now = 1_700_000_000i64;

    p.process_at(GAME, &GameAction::AdvanceDay, now);
    let card_id = p.store().pending_cards(GAME).unwrap()[0].card_id.clone();
    let result = p.process_at(
        GAME,
        &GameAction::DecideCard {
            card_id,
            option_id: "lend".into(),
        },
        now,
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(
        p.store().get_account(GAME, CHECKING).unwrap().balance,
        190_000
    );
    assert_eq!(p.store().event_count(GAME, "card_scheduled").unwrap(), 1);

    // The consequence lands 3-17 days out; sweep it up and accept.
    let mut repaid = false;
    for _ in 0..18 {
        now += 86_400;
        let result = p.process_at(GAME, &GameAction::AdvanceDay, now);
        assert!(result.success, "{:?}", result.errors);
        let pending = p.store().pending_cards(GAME).unwrap();
        if let Some(card) = pending.first() {
            assert_eq!(card.template_id, "friend_repays");
            let result = p.process_at(
                GAME,
                &GameAction::DecideCard {
                    card_id: card.card_id.clone(),
                    option_id: "accept".into(),
                },
                now,
            );
            assert!(result.success, "{:?}", result.errors);
            repaid = true;
            break;
        }
    }
    assert!(repaid, "repayment card never arrived");
    assert_eq!(
        p.store().get_account(GAME, CHECKING).unwrap().balance,
        200_000
    );
}
