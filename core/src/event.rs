//! The append-only game event log.
//!
//! RULE: one typed payload variant per event type — never a free-form map.
//! Rows are write-once; the single permitted deletion is a streak-shield
//! marker consumed when it prevents a streak reset.

use crate::types::{Cents, EntityId, GameId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every notable state transition writes one of these.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    GameCreated {
        date: NaiveDate,
        persona: String,
        difficulty: String,
        region: String,
        seed: String,
    },
    DayAdvanced {
        date: NaiveDate,
    },
    MonthEndCompleted {
        date: NaiveDate,
        month: String,
        net_worth: Cents,
        chi: i64,
        budget_score: i64,
    },

    // ── Cards ──────────────────────────────────────
    CardPresented {
        date: NaiveDate,
        card_id: EntityId,
        template_id: String,
        category: String,
    },
    CardResolved {
        date: NaiveDate,
        card_id: EntityId,
        option_id: String,
        cost: Cents,
        xp: i64,
        coins: i64,
        happiness: i64,
    },
    CardScheduled {
        date: NaiveDate,
        template_id: String,
        due_on: NaiveDate,
        source: String,
    },

    // ── Money movement ─────────────────────────────
    TransferCompleted {
        date: NaiveDate,
        from_account: EntityId,
        to_account: EntityId,
        amount: Cents,
    },
    AccountOpened {
        date: NaiveDate,
        account_id: EntityId,
        kind: String,
        interest_rate: f64,
    },
    AccountClosed {
        date: NaiveDate,
        account_id: EntityId,
        swept_to_primary: Cents,
    },
    SalaryDeposited {
        date: NaiveDate,
        account_id: EntityId,
        amount: Cents,
    },
    BillCharged {
        date: NaiveDate,
        bill_id: EntityId,
        category: String,
        amount: Cents,
        overdrawn: bool,
    },
    InterestPosted {
        date: NaiveDate,
        account_id: EntityId,
        kind: String,
        amount: Cents,
    },
    InvestmentMade {
        date: NaiveDate,
        account_id: EntityId,
        amount: Cents,
    },
    InvestmentSold {
        date: NaiveDate,
        account_id: EntityId,
        amount: Cents,
    },

    // ── Budget ─────────────────────────────────────
    BudgetSet {
        date: NaiveDate,
        allocations: Vec<BudgetAllocation>,
    },

    // ── Insurance ──────────────────────────────────
    PolicyPurchased {
        date: NaiveDate,
        account_id: EntityId,
        insurance_type: String,
        premium: Cents,
    },
    PremiumCharged {
        date: NaiveDate,
        account_id: EntityId,
        insurance_type: String,
        amount: Cents,
    },
    ClaimSettled {
        date: NaiveDate,
        insurance_type: String,
        claim_amount: Cents,
        insurance_paid: Cents,
        deductible_paid: Cents,
        player_pays: Cents,
    },

    // ── Random events ──────────────────────────────
    RandomEventApplied {
        date: NaiveDate,
        kind: String,
        category: String,
        amount: Cents,
        is_positive: bool,
        covered_by_insurance: bool,
        description: String,
    },
    MarketCrashApplied {
        date: NaiveDate,
        account_id: EntityId,
        loss: Cents,
        percent: f64,
    },
    PromotionReceived {
        date: NaiveDate,
        old_income: Cents,
        new_income: Cents,
    },
    BillHiked {
        date: NaiveDate,
        bill_id: EntityId,
        category: String,
        old_amount: Cents,
        new_amount: Cents,
    },
    JobLost {
        date: NaiveDate,
        recovery_on: NaiveDate,
    },
    JobRecovered {
        date: NaiveDate,
        income: Cents,
    },

    // ── Progression ────────────────────────────────
    XpAwarded {
        date: NaiveDate,
        amount: i64,
        reason: String,
        new_total: i64,
    },
    LevelUp {
        date: NaiveDate,
        new_level: u32,
        xp_bonus: i64,
        coin_bonus: i64,
    },
    BadgeEarned {
        date: NaiveDate,
        badge_id: String,
    },
    StreakTick {
        date: NaiveDate,
        metric: String,
        passed: bool,
        count: i64,
    },
    StreakUpdated {
        date: NaiveDate,
        current: i64,
        longest: i64,
        shield_consumed: bool,
    },

    // ── Solvency ───────────────────────────────────
    BankruptcyStageChanged {
        date: NaiveDate,
        stage: String,
    },
    BankruptcyEntered {
        date: NaiveDate,
        recovery_until: NaiveDate,
        accounts_frozen: usize,
    },
    BankruptcyExited {
        date: NaiveDate,
    },

    // ── Taxes ──────────────────────────────────────
    TaxCardPresented {
        date: NaiveDate,
        year: i32,
        total_tax: Cents,
        total_withheld: Cents,
        refund_or_bill: Cents,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetAllocation {
    pub category: String,
    pub amount: Cents,
}

impl GameEvent {
    /// Stable string name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GameCreated { .. } => "game_created",
            Self::DayAdvanced { .. } => "day_advanced",
            Self::MonthEndCompleted { .. } => "month_end_completed",
            Self::CardPresented { .. } => "card_presented",
            Self::CardResolved { .. } => "card_resolved",
            Self::CardScheduled { .. } => "card_scheduled",
            Self::TransferCompleted { .. } => "transfer_completed",
            Self::AccountOpened { .. } => "account_opened",
            Self::AccountClosed { .. } => "account_closed",
            Self::SalaryDeposited { .. } => "salary_deposited",
            Self::BillCharged { .. } => "bill_charged",
            Self::InterestPosted { .. } => "interest_posted",
            Self::InvestmentMade { .. } => "investment_made",
            Self::InvestmentSold { .. } => "investment_sold",
            Self::BudgetSet { .. } => "budget_set",
            Self::PolicyPurchased { .. } => "policy_purchased",
            Self::PremiumCharged { .. } => "premium_charged",
            Self::ClaimSettled { .. } => "claim_settled",
            Self::RandomEventApplied { .. } => "random_event_applied",
            Self::MarketCrashApplied { .. } => "market_crash_applied",
            Self::PromotionReceived { .. } => "promotion_received",
            Self::BillHiked { .. } => "bill_hiked",
            Self::JobLost { .. } => "job_lost",
            Self::JobRecovered { .. } => "job_recovered",
            Self::XpAwarded { .. } => "xp_awarded",
            Self::LevelUp { .. } => "level_up",
            Self::BadgeEarned { .. } => "badge_earned",
            Self::StreakTick { .. } => "streak_tick",
            Self::StreakUpdated { .. } => "streak_updated",
            Self::BankruptcyStageChanged { .. } => "bankruptcy_stage_changed",
            Self::BankruptcyEntered { .. } => "bankruptcy_entered",
            Self::BankruptcyExited { .. } => "bankruptcy_exited",
            Self::TaxCardPresented { .. } => "tax_card_presented",
        }
    }
}

/// The event row as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEventRow {
    pub id: Option<i64>,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub event_type: String,
    /// JSON-serialized GameEvent.
    pub payload: String,
}
