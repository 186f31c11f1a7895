//! Player-initiated money actions: transfers, accounts, investing,
//! insurance, budgets. Uses a quiet config (no random events, no daily
//! cards) so balances stay exact.

use chrono::NaiveDate;
use ledgerlife_core::action::{GameAction, RewardGrant};
use ledgerlife_core::config::GameConfig;
use ledgerlife_core::game::{AccountKind, AccountStatus};
use ledgerlife_core::processor::{ActionProcessor, NewGame};
use ledgerlife_core::store::GameStore;

const GAME: &str = "game-1";
const CHECKING: &str = "acct-000001";
const SAVINGS: &str = "acct-000002";

fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default_test();
    config.event_curves.clear();
    config.card_templates.clear();
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
            seed: "test-seed".to_string(),
        })
        .unwrap();
    processor
}

fn balance(p: &ActionProcessor, account_id: &str) -> i64 {
    p.store().get_account(GAME, account_id).unwrap().balance
}

#[test]
fn entity_ids_number_independently_per_kind() {
    let p = setup();

    // Onboarding mints accounts 1-3 regardless of how many transactions
    // and bills land in between.
    for id in [CHECKING, SAVINGS, "acct-000003"] {
        assert!(p.store().get_account(GAME, id).is_ok(), "{id} missing");
    }
    let txns = p.store().transactions_for_account(GAME, CHECKING).unwrap();
    assert_eq!(txns[0].txn_id, "txn-000001");
    let bill_ids: Vec<String> = p
        .store()
        .bills(GAME)
        .unwrap()
        .into_iter()
        .map(|b| b.bill_id)
        .collect();
    assert_eq!(bill_ids, ["bill-000001", "bill-000002", "bill-000003"]);

    // The next account continues its own sequence at 4.
    let result = p.process(
        GAME,
        &GameAction::OpenAccount {
            kind: AccountKind::Savings,
            principal: None,
            term_months: None,
        },
    );
    assert!(result.success, "{:?}", result.errors);
    assert!(p.store().get_account(GAME, "acct-000004").is_ok());
}

#[test]
fn transfer_moves_funds_with_paired_transactions() {
    let p = setup();
    let result = p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: SAVINGS.into(),
            amount: 50_000,
        },
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(balance(&p, CHECKING), 150_000);
    assert_eq!(balance(&p, SAVINGS), 50_000);

    // Two postings summing to zero, both categorized as transfer.
    let from_txns = p.store().transactions_for_account(GAME, CHECKING).unwrap();
    let last = from_txns.last().unwrap();
    assert_eq!(last.category, "transfer");
    assert_eq!(last.amount, -50_000);
}

#[test]
fn transfer_rejects_bad_inputs() {
    let p = setup();

    let result = p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: SAVINGS.into(),
            amount: 900_000,
        },
    );
    assert!(!result.success);
    assert_eq!(result.errors[0].code, "INSUFFICIENT_FUNDS");
    assert_eq!(balance(&p, CHECKING), 200_000);

    let result = p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: CHECKING.into(),
            amount: 1_000,
        },
    );
    assert_eq!(result.errors[0].code, "VALIDATION_ERROR");

    let result = p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: "acct-999999".into(),
            amount: 1_000,
        },
    );
    assert_eq!(result.errors[0].code, "ACCOUNT_NOT_FOUND");
}

#[test]
fn loan_disburses_principal_into_checking() {
    let p = setup();
    let result = p.process(
        GAME,
        &GameAction::OpenAccount {
            kind: AccountKind::Loan,
            principal: Some(100_000),
            term_months: Some(12),
        },
    );
    assert!(result.success, "{:?}", result.errors);

    let loan = p.store().get_account(GAME, "acct-000004").unwrap();
    assert_eq!(loan.kind, AccountKind::Loan);
    assert_eq!(loan.balance, -100_000);
    assert_eq!(balance(&p, CHECKING), 300_000);
    // Debt offsets the cash: net worth is unchanged.
    assert_eq!(result.state.unwrap().net_worth, 200_000);

    let result = p.process(
        GAME,
        &GameAction::OpenAccount {
            kind: AccountKind::Mortgage,
            principal: None,
            term_months: None,
        },
    );
    assert_eq!(result.errors[0].code, "VALIDATION_ERROR");
}

#[test]
fn closing_an_account_sweeps_to_primary() {
    let p = setup();
    p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: SAVINGS.into(),
            amount: 30_000,
        },
    );
    let result = p.process(GAME, &GameAction::CloseAccount { account_id: SAVINGS.into() });
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(balance(&p, CHECKING), 200_000);
    let savings = p.store().get_account(GAME, SAVINGS).unwrap();
    assert_eq!(savings.status, AccountStatus::Closed);
}

#[test]
fn closing_a_debtor_account_is_rejected() {
    let p = setup();
    p.process(
        GAME,
        &GameAction::OpenAccount {
            kind: AccountKind::Loan,
            principal: Some(50_000),
            term_months: Some(6),
        },
    );
    let result = p.process(GAME, &GameAction::CloseAccount { account_id: "acct-000004".into() });
    assert!(!result.success);
    assert_eq!(result.errors[0].code, "OUTSTANDING_BALANCE");
}

#[test]
fn investing_opens_an_account_and_earns_the_badge() {
    let p = setup();
    let result = p.process(GAME, &GameAction::Invest { amount: 40_000 });
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(balance(&p, CHECKING), 160_000);
    assert_eq!(balance(&p, "acct-000004"), 40_000);
    assert!(result
        .rewards
        .iter()
        .any(|r| matches!(r, RewardGrant::Badge { badge_id } if badge_id == "first_investment")));

    // Second buy reuses the same account, no second badge.
    let result = p.process(GAME, &GameAction::Invest { amount: 10_000 });
    assert!(result.success);
    assert_eq!(balance(&p, "acct-000004"), 50_000);
    assert!(!result.rewards.iter().any(|r| matches!(r, RewardGrant::Badge { .. })));

    let result = p.process(GAME, &GameAction::SellInvestment { amount: 15_000 });
    assert!(result.success);
    assert_eq!(balance(&p, "acct-000004"), 35_000);
    assert_eq!(balance(&p, CHECKING), 165_000);

    let result = p.process(GAME, &GameAction::SellInvestment { amount: 999_999 });
    assert_eq!(result.errors[0].code, "INSUFFICIENT_FUNDS");
}

#[test]
fn insurance_policy_lifecycle() {
    let p = setup();
    let result = p.process(GAME, &GameAction::BuyInsurance { insurance_type: "health".into() });
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(balance(&p, CHECKING), 182_000); // 18_000 premium at 1.0x
    assert!(result
        .rewards
        .iter()
        .any(|r| matches!(r, RewardGrant::Badge { badge_id } if badge_id == "insured")));

    let result = p.process(GAME, &GameAction::BuyInsurance { insurance_type: "health".into() });
    assert_eq!(result.errors[0].code, "ALREADY_INSURED");

    // 100k claim: 50k deductible, then 80% of the 50k remainder.
    let result = p.process(
        GAME,
        &GameAction::FileClaim {
            insurance_type: "health".into(),
            claim_amount: 100_000,
        },
    );
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(balance(&p, CHECKING), 222_000);

    let result = p.process(
        GAME,
        &GameAction::FileClaim {
            insurance_type: "auto".into(),
            claim_amount: 10_000,
        },
    );
    assert_eq!(result.errors[0].code, "NO_POLICY");
}

#[test]
fn budget_is_validated_and_replaced() {
    use ledgerlife_core::event::BudgetAllocation;

    let p = setup();
    let result = p.process(GAME, &GameAction::SetBudget { allocations: vec![] });
    assert_eq!(result.errors[0].code, "VALIDATION_ERROR");

    let result = p.process(
        GAME,
        &GameAction::SetBudget {
            allocations: vec![BudgetAllocation { category: "housing".into(), amount: -5 }],
        },
    );
    assert_eq!(result.errors[0].code, "VALIDATION_ERROR");

    let result = p.process(
        GAME,
        &GameAction::SetBudget {
            allocations: vec![
                BudgetAllocation { category: "housing".into(), amount: 110_000 },
                BudgetAllocation { category: "food".into(), amount: 40_000 },
            ],
        },
    );
    assert!(result.success, "{:?}", result.errors);
    let stored = p.store().budget_allocations(GAME).unwrap();
    assert_eq!(stored.len(), 2);

    // A later set replaces, never merges.
    p.process(
        GAME,
        &GameAction::SetBudget {
            allocations: vec![BudgetAllocation { category: "food".into(), amount: 50_000 }],
        },
    );
    let stored = p.store().budget_allocations(GAME).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, 50_000);
}

#[test]
fn failed_actions_roll_back_completely() {
    let p = setup();
    let before = p.store().load_game(GAME).unwrap();
    let result = p.process(
        GAME,
        &GameAction::Transfer {
            from_account: CHECKING.into(),
            to_account: SAVINGS.into(),
            amount: 900_000,
        },
    );
    assert!(!result.success);
    let after = p.store().load_game(GAME).unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.entity_seq, before.entity_seq);
    assert_eq!(balance(&p, CHECKING), 200_000);
}
