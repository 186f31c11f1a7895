//! Scenario selection and random-event rolling.
//!
//! Both functions are deterministic given their RNG stream: daily cards
//! draw from the `-cards-{date}` stream, events from `-events-{date}`, so
//! draws for unrelated purposes never influence each other.

use crate::cards::DecisionCardTemplate;
use crate::config::EventCurve;
use crate::rng::GameRng;
use crate::types::Cents;
use serde::{Deserialize, Serialize};

/// Player context the card selector filters against.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub persona: String,
    pub level: u32,
    /// Template ids presented in the last 7 days — excluded from selection.
    pub recent_template_ids: Vec<String>,
    pub recent_categories: Vec<String>,
}

/// Filter eligible templates, then weighted-sample without replacement.
/// Returns up to `count` templates (fewer when the eligible pool is
/// smaller).
pub fn select_daily_scenarios<'a>(
    rng: &mut GameRng,
    candidates: &'a [DecisionCardTemplate],
    ctx: &ScenarioContext,
    count: usize,
) -> Vec<&'a DecisionCardTemplate> {
    let mut pool: Vec<&DecisionCardTemplate> = candidates
        .iter()
        .filter(|t| t.applies_to(&ctx.persona, ctx.level))
        .filter(|t| !ctx.recent_template_ids.iter().any(|id| id == &t.template_id))
        .collect();

    let mut picked = Vec::with_capacity(count);
    while picked.len() < count && !pool.is_empty() {
        let weights: Vec<f64> = pool.iter().map(|t| t.frequency_weight).collect();
        let Some(idx) = rng.weighted_index(&weights) else {
            break;
        };
        picked.push(pool.swap_remove(idx));
    }
    picked
}

/// The event kinds the daily roll can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MarketCrash,
    Promotion,
    RentHike,
    UtilityHike,
    JobLoss,
    MedicalEmergency,
    CarRepair,
    HomeRepair,
    Windfall,
    UnexpectedExpense,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketCrash => "market_crash",
            Self::Promotion => "promotion",
            Self::RentHike => "rent_hike",
            Self::UtilityHike => "utility_hike",
            Self::JobLoss => "job_loss",
            Self::MedicalEmergency => "medical_emergency",
            Self::CarRepair => "car_repair",
            Self::HomeRepair => "home_repair",
            Self::Windfall => "windfall",
            Self::UnexpectedExpense => "unexpected_expense",
        }
    }

    /// Kinds whose effect is a percentage, not a flat posting.
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            Self::MarketCrash | Self::Promotion | Self::RentHike | Self::UtilityHike
        )
    }
}

/// Everything the roll needs to modulate per-kind probabilities.
#[derive(Debug, Clone)]
pub struct EventRollContext {
    pub difficulty_event_multiplier: f64,
    pub persona: String,
    pub level: u32,
    pub monthly_income: Cents,
    pub is_month_end: bool,
    pub is_quarter_end: bool,
}

/// One event the daily roll produced, before injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredEvent {
    pub kind: EventKind,
    pub category: String,
    /// Flat cents for posting kinds; ignored for percentage kinds.
    pub amount: Cents,
    /// Filled for percentage kinds (0.08 = 8%).
    pub percent: Option<f64>,
    pub is_positive: bool,
    pub insurance_type: Option<String>,
    pub requires_decision: bool,
    pub happiness_delta: i64,
    pub description: String,
}

/// Roll every configured curve once for the day.
///
/// Draw order is fixed by the curve table order; each curve consumes a
/// probability draw and, on trigger, an amount draw. Month/quarter-end
/// boosts multiply the base probability for curves that opt in.
pub fn roll_daily_events(
    rng: &mut GameRng,
    curves: &[EventCurve],
    ctx: &EventRollContext,
) -> Vec<TriggeredEvent> {
    let mut triggered = Vec::new();
    for curve in curves {
        if ctx.level < curve.min_level {
            continue;
        }
        if !curve.persona_tags.is_empty() && !curve.persona_tags.iter().any(|p| p == &ctx.persona) {
            continue;
        }

        let mut p = curve.base_probability * ctx.difficulty_event_multiplier;
        if ctx.is_month_end {
            p *= curve.month_end_boost;
        }
        if ctx.is_quarter_end {
            p *= curve.quarter_end_boost;
        }
        if !rng.chance(p.clamp(0.0, 1.0)) {
            continue;
        }

        let (amount, percent) = if curve.kind.is_percentage() {
            let span = (curve.max_percent - curve.min_percent).max(0.0);
            (0, Some(curve.min_percent + rng.next_f64() * span))
        } else {
            let amount = if ctx.monthly_income > 0 {
                let lo = (ctx.monthly_income as f64 * curve.min_income_frac).round() as i64;
                let hi = (ctx.monthly_income as f64 * curve.max_income_frac).round() as i64;
                rng.range_i64(lo.min(hi).max(1), hi.max(lo).max(1))
            } else {
                rng.range_i64(curve.fallback_amount / 2, curve.fallback_amount.max(1))
            };
            (amount, None)
        };

        triggered.push(TriggeredEvent {
            kind: curve.kind,
            category: curve.category.clone(),
            amount,
            percent,
            is_positive: curve.is_positive,
            insurance_type: curve.insurance_type.clone(),
            requires_decision: curve.requires_decision,
            happiness_delta: curve.happiness_delta,
            description: curve.description.clone(),
        });
    }
    triggered
}
