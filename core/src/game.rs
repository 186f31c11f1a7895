//! The game aggregate root and its owned financial records.
//!
//! A `Game` is one player's persistent financial life. It is mutated
//! exclusively by the action processor inside a locked unit of work, and
//! every committed mutation bumps `version` by exactly one.

use crate::formulas::{BankruptcyStage, CreditHealthFactors};
use crate::types::{Cents, Coins, EntityId, GameId, Xp};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    /// Owner of the cross-game XP/coin ledgers.
    pub user_id: String,
    pub persona: String,
    pub difficulty: String,
    pub region: String,
    pub currency: String,
    /// Current simulated calendar date.
    pub date: NaiveDate,
    pub level: u32,
    pub xp: Xp,
    pub coins: Coins,
    /// 0–100.
    pub happiness: i64,
    pub net_worth: Cents,
    pub chi: i64,
    pub chi_factors: CreditHealthFactors,
    pub budget_score: i64,
    pub streak_current: i64,
    pub streak_longest: i64,
    /// Unix timestamp of the last processed action (real wall-clock).
    pub last_action_at: i64,
    pub bankruptcy_stage: BankruptcyStage,
    pub bankrupt_until: Option<NaiveDate>,
    pub bankruptcy_count: i64,
    pub consecutive_negative_months: u32,
    pub consecutive_positive_months: u32,
    pub monthly_income: Cents,
    /// Salary held aside while unemployed, restored on recovery.
    pub pre_jobloss_income: Option<Cents>,
    pub job_recovery_on: Option<NaiveDate>,
    pub last_tax_year: Option<i32>,
    /// Per-kind monotonic counters for deterministic entity ids.
    pub entity_seq: EntityCounters,
    /// Optimistic concurrency counter. Strictly increases on every commit.
    pub version: i64,
    /// Base seed, fixed at creation. Per-purpose streams derive from it.
    pub seed: String,
}

/// Per-kind monotonic counters backing deterministic entity ids, so each
/// prefix numbers independently: the first savings account is always
/// `acct-000002` no matter how many transactions preceded it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EntityCounters {
    pub accounts: i64,
    pub transactions: i64,
    pub cards: i64,
    pub bills: i64,
    pub schedules: i64,
}

impl EntityCounters {
    fn bump(&mut self, prefix: &str) -> i64 {
        let counter = match prefix {
            "acct" => &mut self.accounts,
            "txn" => &mut self.transactions,
            "card" => &mut self.cards,
            "bill" => &mut self.bills,
            _ => &mut self.schedules, // "sched"
        };
        *counter += 1;
        *counter
    }
}

impl Game {
    /// Mint the next deterministic entity id, e.g. `txn-000042`.
    pub fn next_id(&mut self, prefix: &str) -> EntityId {
        format!("{prefix}-{:06}", self.entity_seq.bump(prefix))
    }

    pub fn nudge_happiness(&mut self, delta: i64) {
        self.happiness = (self.happiness + delta).clamp(0, 100);
    }

    pub fn is_bankrupt(&self) -> bool {
        self.bankruptcy_stage == BankruptcyStage::Bankrupt
    }
}

/// True when `date` is the last day of its calendar month.
pub fn is_month_end(date: NaiveDate) -> bool {
    (date + Duration::days(1)).month() != date.month()
}

/// True on the last day of March, June, September, December.
pub fn is_quarter_end(date: NaiveDate) -> bool {
    is_month_end(date) && matches!(date.month(), 3 | 6 | 9 | 12)
}

/// `YYYY-MM` key used by monthly reports and spend queries.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    Prepaid,
    CreditCard,
    Loan,
    Mortgage,
    Investment,
    Insurance,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::Prepaid => "prepaid",
            Self::CreditCard => "credit_card",
            Self::Loan => "loan",
            Self::Mortgage => "mortgage",
            Self::Investment => "investment",
            Self::Insurance => "insurance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "checking" => Some(Self::Checking),
            "savings" => Some(Self::Savings),
            "prepaid" => Some(Self::Prepaid),
            "credit_card" => Some(Self::CreditCard),
            "loan" => Some(Self::Loan),
            "mortgage" => Some(Self::Mortgage),
            "investment" => Some(Self::Investment),
            "insurance" => Some(Self::Insurance),
            _ => None,
        }
    }

    /// Kinds whose balance represents debt (negative = owed).
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::CreditCard | Self::Loan | Self::Mortgage)
    }

    /// Kinds disbursing a principal into the primary account on open.
    pub fn is_loan_like(&self) -> bool {
        matches!(self, Self::Loan | Self::Mortgage)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "frozen" => Self::Frozen,
            "closed" => Self::Closed,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: EntityId,
    pub game_id: GameId,
    pub kind: AccountKind,
    /// Signed cents. Negative means owed for credit-type accounts.
    pub balance: Cents,
    /// Annual rate, percent (APY for deposits, APR for credit).
    pub interest_rate: f64,
    pub credit_limit: Option<Cents>,
    pub principal: Option<Cents>,
    pub term_months: Option<u32>,
    pub opened_on: NaiveDate,
    pub status: AccountStatus,
    // Insurance-policy terms; set only for AccountKind::Insurance.
    pub insurance_type: Option<String>,
    pub premium: Option<Cents>,
    pub deductible: Option<Cents>,
    pub coverage_rate: Option<f64>,
}

/// Immutable row recording one balance change. Every balance delta is
/// paired with exactly one of these (transfers produce two, summing to
/// zero).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRow {
    pub txn_id: EntityId,
    pub account_id: EntityId,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub category: String,
    /// Signed delta applied to the balance.
    pub amount: Cents,
    /// Balance snapshot immediately after the update.
    pub balance_after: Cents,
    pub description: String,
    pub source_card: Option<EntityId>,
    pub automated: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillFrequency {
    Weekly,
    Monthly,
    Quarterly,
}

impl BillFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "weekly" => Self::Weekly,
            "quarterly" => Self::Quarterly,
            _ => Self::Monthly,
        }
    }

    /// Next due date after a charge on `due`.
    pub fn advance(&self, due: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => due + Duration::days(7),
            Self::Monthly => add_months(due, 1),
            Self::Quarterly => add_months(due, 3),
        }
    }
}

/// Recurring obligation swept by the daily/month-end bill pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBill {
    pub bill_id: EntityId,
    pub game_id: GameId,
    pub name: String,
    pub category: String,
    pub amount: Cents,
    pub frequency: BillFrequency,
    pub next_due_on: NaiveDate,
    pub autopay: bool,
}

/// Calendar-aware month stepping: clamps the day to the target month's
/// length (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12) as u32;
    let mut day = date.day();
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month0 + 1, day) {
            return d;
        }
        day -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_end_detection() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert!(is_month_end(d));
        assert!(!is_month_end(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()));
        assert!(is_quarter_end(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!is_quarter_end(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()));
    }

    #[test]
    fn add_months_clamps_day() {
        let jan31 = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(add_months(jan31, 1), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        let nov30 = NaiveDate::from_ymd_opt(2023, 11, 30).unwrap();
        assert_eq!(add_months(nov30, 3), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
