//! Decision cards: catalog templates, pending instances, and the
//! scheduled-insertion records used for consequence chaining.
//!
//! A pending card snapshots its options as JSON at presentation time, so
//! synthetic cards (random-event trade-offs, tax filing) resolve through
//! the same path as catalog cards.

use crate::types::{Cents, EntityId, GameId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which account an option's cost is charged against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    #[default]
    Primary,
    CreditCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardOption {
    pub option_id: String,
    pub label: String,
    /// Positive = player pays, negative = player receives.
    pub cost: Cents,
    pub xp: i64,
    pub coins: i64,
    pub happiness: i64,
    #[serde(default)]
    pub pay_with: PaymentSource,
    /// Template id of a follow-up card to schedule 3–17 days out.
    #[serde(default)]
    pub consequence_template: Option<String>,
}

/// Catalog entry a daily card is instantiated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionCardTemplate {
    pub template_id: String,
    pub category: String,
    pub description: String,
    /// Personas this card applies to; empty = all personas.
    #[serde(default)]
    pub persona_tags: Vec<String>,
    pub min_level: u32,
    pub max_level: u32,
    /// Selection weight for weighted sampling without replacement.
    pub frequency_weight: f64,
    pub options: Vec<CardOption>,
}

impl DecisionCardTemplate {
    pub fn applies_to(&self, persona: &str, level: u32) -> bool {
        let persona_ok =
            self.persona_tags.is_empty() || self.persona_tags.iter().any(|t| t == persona);
        persona_ok && level >= self.min_level && level <= self.max_level
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Pending,
    Resolved,
    Expired,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "resolved" => Self::Resolved,
            "expired" => Self::Expired,
            _ => Self::Pending,
        }
    }
}

/// An instantiated decision prompt awaiting the player's choice.
/// Blocks day advancement until resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCard {
    pub card_id: EntityId,
    pub game_id: GameId,
    pub template_id: String,
    pub category: String,
    pub description: String,
    pub presented_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub status: CardStatus,
    pub chosen_option: Option<String>,
    /// Options snapshot, fixed at presentation time.
    pub options: Vec<CardOption>,
}

impl PendingCard {
    pub fn option(&self, option_id: &str) -> Option<&CardOption> {
        self.options.iter().find(|o| o.option_id == option_id)
    }
}

/// A consequence card waiting to be presented. Not a pointer graph:
/// just a (template id, target date) record swept on day advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCard {
    pub sched_id: EntityId,
    pub game_id: GameId,
    pub template_id: String,
    pub due_on: NaiveDate,
    /// What scheduled it: "card_consequence" or "event".
    pub source: String,
}

/// Build the trade-off card for a negative random event that requires a
/// decision: pay in full, put it on credit, or negotiate a discount at a
/// happiness cost.
pub fn event_decision_options(amount: Cents) -> Vec<CardOption> {
    let negotiated = (amount as f64 * 0.7).round() as Cents;
    vec![
        CardOption {
            option_id: "pay_full".into(),
            label: "Pay in full".into(),
            cost: amount,
            xp: 8,
            coins: 0,
            happiness: -2,
            pay_with: PaymentSource::Primary,
            consequence_template: None,
        },
        CardOption {
            option_id: "pay_credit".into(),
            label: "Put it on the credit card".into(),
            cost: amount,
            xp: 4,
            coins: 0,
            happiness: -1,
            pay_with: PaymentSource::CreditCard,
            consequence_template: None,
        },
        CardOption {
            option_id: "negotiate".into(),
            label: "Negotiate a lower bill".into(),
            cost: negotiated,
            xp: 5,
            coins: 0,
            happiness: -6,
            pay_with: PaymentSource::Primary,
            consequence_template: None,
        },
    ]
}

/// Tax-filing options: careful self-file, quick self-file, paid preparer.
/// `refund_or_bill` positive = refund. The careful option keeps the full
/// amount; the quick option forfeits part of a refund (sloppy deductions)
/// or inflates a bill; the preparer charges a flat fee but maximizes the
/// outcome.
pub fn tax_filing_options(refund_or_bill: Cents, preparer_fee: Cents) -> Vec<CardOption> {
    let quick_delta = (refund_or_bill as f64 * 0.1).abs().round() as Cents;
    vec![
        CardOption {
            option_id: "careful_self_file".into(),
            label: "File carefully yourself".into(),
            cost: -refund_or_bill,
            xp: 25,
            coins: 5,
            happiness: -3,
            pay_with: PaymentSource::Primary,
            consequence_template: None,
        },
        CardOption {
            option_id: "quick_self_file".into(),
            label: "File quickly yourself".into(),
            cost: -refund_or_bill + quick_delta,
            xp: 10,
            coins: 0,
            happiness: 1,
            pay_with: PaymentSource::Primary,
            consequence_template: None,
        },
        CardOption {
            option_id: "paid_preparer".into(),
            label: "Hire a preparer".into(),
            cost: -refund_or_bill + preparer_fee,
            xp: 15,
            coins: 0,
            happiness: 2,
            pay_with: PaymentSource::Primary,
            consequence_template: None,
        },
    ]
}
