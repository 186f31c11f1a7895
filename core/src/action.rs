//! Player actions and their results.
//!
//! `GameAction` is a closed sum type: one variant per action kind with a
//! strongly-typed payload, dispatched by exhaustive match in the
//! processor. Adding an action kind is a compile-time-checked change.

use crate::event::{BudgetAllocation, GameEvent};
use crate::game::AccountKind;
use crate::types::{Cents, EntityId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
    AdvanceDay,
    DecideCard {
        card_id: EntityId,
        option_id: String,
    },
    Transfer {
        from_account: EntityId,
        to_account: EntityId,
        amount: Cents,
    },
    SetBudget {
        allocations: Vec<BudgetAllocation>,
    },
    OpenAccount {
        kind: AccountKind,
        /// Required for loan-like kinds; ignored otherwise.
        principal: Option<Cents>,
        term_months: Option<u32>,
    },
    CloseAccount {
        account_id: EntityId,
    },
    Invest {
        amount: Cents,
    },
    SellInvestment {
        amount: Cents,
    },
    BuyInsurance {
        insurance_type: String,
    },
    FileClaim {
        insurance_type: String,
        claim_amount: Cents,
    },
}

impl GameAction {
    /// Stable action-type tag used for badge evaluation and logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AdvanceDay => "advance_day",
            Self::DecideCard { .. } => "decide_card",
            Self::Transfer { .. } => "transfer",
            Self::SetBudget { .. } => "set_budget",
            Self::OpenAccount { .. } => "open_account",
            Self::CloseAccount { .. } => "close_account",
            Self::Invest { .. } => "invest",
            Self::SellInvestment { .. } => "sell_investment",
            Self::BuyInsurance { .. } => "buy_insurance",
            Self::FileClaim { .. } => "file_claim",
        }
    }
}

/// Rewards granted by one action, in grant order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardGrant {
    Xp { amount: i64, reason: String },
    Coins { amount: i64, reason: String },
    LevelUp { level: u32, xp_bonus: i64, coin_bonus: i64 },
    Badge { badge_id: String },
}

/// Partial game view returned to the edge layer after each action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateView {
    pub game_id: String,
    pub date: NaiveDate,
    pub level: u32,
    pub xp: i64,
    pub coins: i64,
    pub happiness: i64,
    pub net_worth: Cents,
    pub chi: i64,
    pub budget_score: i64,
    pub streak_current: i64,
    pub streak_longest: i64,
    pub bankruptcy_stage: String,
    pub pending_cards: usize,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

/// What the processor hands back for every action, success or not.
/// On failure nothing was committed: `state` reflects the untouched game
/// when it could still be read, and `errors` carries the structured code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameActionResult {
    pub success: bool,
    pub state: Option<GameStateView>,
    pub events: Vec<GameEvent>,
    pub rewards: Vec<RewardGrant>,
    pub errors: Vec<ActionError>,
}

impl GameActionResult {
    pub fn failure(code: &str, message: String) -> Self {
        Self {
            success: false,
            state: None,
            events: Vec::new(),
            rewards: Vec::new(),
            errors: vec![ActionError { code: code.to_string(), message }],
        }
    }
}
