//! Static game-balance configuration.
//!
//! Loaded once at process start into an immutable `GameConfig` and passed
//! into the action processor's constructor — never ambient global state.
//! In tests, use `GameConfig::default_test()`.

use crate::cards::{CardOption, DecisionCardTemplate, PaymentSource};
use crate::error::{GameError, GameResult};
use crate::formulas::{BankruptcyThresholds, CreditHealthWeights, RoundingMode};
use crate::scenario::EventKind;
use crate::types::Cents;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub id: String,
    pub label: String,
    pub xp_multiplier: f64,
    /// Overrides the region's savings APY when set.
    pub savings_apy_override: Option<f64>,
    /// Overrides the region's credit-card APR when set.
    pub credit_card_apr_override: Option<f64>,
    pub premium_multiplier: f64,
    pub event_probability_multiplier: f64,
    pub daily_xp: i64,
    pub month_end_xp_bonus: i64,
    pub starting_balance: Cents,
    pub monthly_salary: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,
    pub currency: String,
    pub savings_apy: f64,
    pub credit_card_apr: f64,
    pub loan_rate: f64,
    pub mortgage_rate: f64,
    pub investment_return: f64,
    pub default_credit_limit: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level: u32,
    /// Cumulative XP required to reach this level.
    pub cumulative_xp: i64,
    /// One-time XP bonus granted when the level is crossed.
    pub xp_bonus: i64,
    pub coin_bonus: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    pub filing_month: u32,
    pub filing_day: u32,
    /// Tax cards are only presented once the player reaches this level.
    pub min_level: u32,
    pub tax_rate: f64,
    pub withholding_rate: f64,
    pub preparer_fee: Cents,
}

/// Per-kind probability curve for the daily event roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCurve {
    pub kind: EventKind,
    pub category: String,
    pub description: String,
    pub base_probability: f64,
    /// Probability multipliers on calendar boundaries (1.0 = no change).
    pub month_end_boost: f64,
    pub quarter_end_boost: f64,
    /// Amount range as a fraction of monthly income (flat-posting kinds).
    pub min_income_frac: f64,
    pub max_income_frac: f64,
    /// Used when the player has no income.
    pub fallback_amount: Cents,
    /// Percent range for percentage kinds (crash, promotion, hikes).
    pub min_percent: f64,
    pub max_percent: f64,
    pub is_positive: bool,
    pub insurance_type: Option<String>,
    pub requires_decision: bool,
    pub happiness_delta: i64,
    pub min_level: u32,
    #[serde(default)]
    pub persona_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceProduct {
    pub insurance_type: String,
    pub base_premium: Cents,
    pub deductible: Cents,
    pub coverage_rate: f64,
}

/// A badge rule: fires when its tag appears in an action's tag set.
/// Each badge is awarded at most once per game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRule {
    pub badge_id: String,
    pub tag: String,
    pub reward_xp: i64,
    pub reward_coins: i64,
    #[serde(default)]
    pub grants_streak_shield: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulties: HashMap<String, DifficultyConfig>,
    pub regions: HashMap<String, RegionConfig>,
    /// Ordered ascending by level.
    pub levels: Vec<LevelConfig>,
    pub chi_weights: CreditHealthWeights,
    pub rounding: RoundingMode,
    pub bankruptcy: BankruptcyThresholds,
    pub tax: TaxConfig,
    pub event_curves: Vec<EventCurve>,
    pub card_templates: Vec<DecisionCardTemplate>,
    pub insurance_products: HashMap<String, InsuranceProduct>,
    pub badges: Vec<BadgeRule>,
    pub daily_cards_per_day: usize,
    /// Templates presented within this many days are excluded from selection.
    pub card_recency_days: i64,
    /// Consequence cards land this many days out (inclusive range).
    pub consequence_min_days: i64,
    pub consequence_max_days: i64,
    pub card_expiry_days: i64,
    pub job_loss_recovery_days: i64,
    /// Real-time gap after which the daily streak resets (unless shielded).
    pub streak_gap_seconds: i64,
}

impl GameConfig {
    pub fn difficulty(&self, id: &str) -> GameResult<&DifficultyConfig> {
        self.difficulties
            .get(id)
            .ok_or_else(|| GameError::Validation(format!("unknown difficulty '{id}'")))
    }

    pub fn region(&self, id: &str) -> GameResult<&RegionConfig> {
        self.regions
            .get(id)
            .ok_or_else(|| GameError::Validation(format!("unknown region '{id}'")))
    }

    /// Effective savings APY: difficulty override, else region default.
    pub fn savings_apy(&self, difficulty: &DifficultyConfig, region: &RegionConfig) -> f64 {
        difficulty.savings_apy_override.unwrap_or(region.savings_apy)
    }

    /// Effective credit-card APR: difficulty override, else region default.
    pub fn credit_card_apr(&self, difficulty: &DifficultyConfig, region: &RegionConfig) -> f64 {
        difficulty
            .credit_card_apr_override
            .unwrap_or(region.credit_card_apr)
    }

    /// Level config for `level`, if the table defines it.
    pub fn level(&self, level: u32) -> Option<&LevelConfig> {
        self.levels.iter().find(|l| l.level == level)
    }

    /// Load from a single JSON document.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests and the runner.
    pub fn default_test() -> Self {
        let difficulties = [
            (
                "normal".to_string(),
                DifficultyConfig {
                    id: "normal".into(),
                    label: "Normal".into(),
                    xp_multiplier: 1.0,
                    savings_apy_override: None,
                    credit_card_apr_override: None,
                    premium_multiplier: 1.0,
                    event_probability_multiplier: 1.0,
                    daily_xp: 5,
                    month_end_xp_bonus: 50,
                    starting_balance: 200_000, // $2,000.00
                    monthly_salary: 350_000,   // $3,500.00
                },
            ),
            (
                "hard".to_string(),
                DifficultyConfig {
                    id: "hard".into(),
                    label: "Hard".into(),
                    xp_multiplier: 1.5,
                    savings_apy_override: Some(2.0),
                    credit_card_apr_override: Some(28.0),
                    premium_multiplier: 1.4,
                    event_probability_multiplier: 1.5,
                    daily_xp: 5,
                    month_end_xp_bonus: 75,
                    starting_balance: 80_000,
                    monthly_salary: 260_000,
                },
            ),
        ]
        .into();

        let regions = [(
            "us".to_string(),
            RegionConfig {
                id: "us".into(),
                currency: "USD".into(),
                savings_apy: 4.0,
                credit_card_apr: 22.0,
                loan_rate: 9.5,
                mortgage_rate: 6.8,
                investment_return: 7.0,
                default_credit_limit: 150_000,
            },
        )]
        .into();

        let levels = vec![
            LevelConfig { level: 1, cumulative_xp: 0, xp_bonus: 0, coin_bonus: 0 },
            LevelConfig { level: 2, cumulative_xp: 100, xp_bonus: 10, coin_bonus: 25 },
            LevelConfig { level: 3, cumulative_xp: 250, xp_bonus: 15, coin_bonus: 50 },
            LevelConfig { level: 4, cumulative_xp: 500, xp_bonus: 20, coin_bonus: 75 },
            LevelConfig { level: 5, cumulative_xp: 900, xp_bonus: 25, coin_bonus: 100 },
            LevelConfig { level: 6, cumulative_xp: 1_500, xp_bonus: 30, coin_bonus: 150 },
            LevelConfig { level: 7, cumulative_xp: 2_400, xp_bonus: 40, coin_bonus: 200 },
            LevelConfig { level: 8, cumulative_xp: 3_600, xp_bonus: 50, coin_bonus: 250 },
        ];

        let event_curves = vec![
            EventCurve {
                kind: EventKind::UnexpectedExpense,
                category: "misc".into(),
                description: "An unexpected expense came up".into(),
                base_probability: 0.06,
                month_end_boost: 1.0,
                quarter_end_boost: 1.0,
                min_income_frac: 0.02,
                max_income_frac: 0.10,
                fallback_amount: 8_000,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: false,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: -3,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::Windfall,
                category: "misc".into(),
                description: "A small windfall landed in your lap".into(),
                base_probability: 0.04,
                month_end_boost: 1.0,
                quarter_end_boost: 1.0,
                min_income_frac: 0.02,
                max_income_frac: 0.08,
                fallback_amount: 6_000,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: true,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: 3,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::CarRepair,
                category: "transport".into(),
                description: "The car broke down".into(),
                base_probability: 0.02,
                month_end_boost: 1.0,
                quarter_end_boost: 1.0,
                min_income_frac: 0.10,
                max_income_frac: 0.30,
                fallback_amount: 40_000,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: false,
                insurance_type: Some("auto".into()),
                requires_decision: true,
                happiness_delta: -4,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::MedicalEmergency,
                category: "health".into(),
                description: "A medical emergency".into(),
                base_probability: 0.012,
                month_end_boost: 1.0,
                quarter_end_boost: 1.0,
                min_income_frac: 0.20,
                max_income_frac: 0.60,
                fallback_amount: 80_000,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: false,
                insurance_type: Some("health".into()),
                requires_decision: true,
                happiness_delta: -6,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::HomeRepair,
                category: "housing".into(),
                description: "Something in the home needs fixing".into(),
                base_probability: 0.015,
                month_end_boost: 1.0,
                quarter_end_boost: 1.0,
                min_income_frac: 0.08,
                max_income_frac: 0.25,
                fallback_amount: 30_000,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: false,
                insurance_type: Some("home".into()),
                requires_decision: true,
                happiness_delta: -3,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::RentHike,
                category: "housing".into(),
                description: "The landlord raised the rent".into(),
                base_probability: 0.008,
                month_end_boost: 2.5,
                quarter_end_boost: 3.0,
                min_income_frac: 0.0,
                max_income_frac: 0.0,
                fallback_amount: 0,
                min_percent: 0.03,
                max_percent: 0.10,
                is_positive: false,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: -4,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::UtilityHike,
                category: "utilities".into(),
                description: "Utility rates went up".into(),
                base_probability: 0.008,
                month_end_boost: 2.0,
                quarter_end_boost: 2.5,
                min_income_frac: 0.0,
                max_income_frac: 0.0,
                fallback_amount: 0,
                min_percent: 0.04,
                max_percent: 0.12,
                is_positive: false,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: -2,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::Promotion,
                category: "income".into(),
                description: "You earned a promotion".into(),
                base_probability: 0.004,
                month_end_boost: 2.0,
                quarter_end_boost: 4.0,
                min_income_frac: 0.0,
                max_income_frac: 0.0,
                fallback_amount: 0,
                min_percent: 0.04,
                max_percent: 0.12,
                is_positive: true,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: 6,
                min_level: 2,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::MarketCrash,
                category: "investing".into(),
                description: "Markets dropped sharply".into(),
                base_probability: 0.003,
                month_end_boost: 1.5,
                quarter_end_boost: 2.0,
                min_income_frac: 0.0,
                max_income_frac: 0.0,
                fallback_amount: 0,
                min_percent: 0.05,
                max_percent: 0.25,
                is_positive: false,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: -5,
                min_level: 1,
                persona_tags: vec![],
            },
            EventCurve {
                kind: EventKind::JobLoss,
                category: "income".into(),
                description: "You lost your job".into(),
                base_probability: 0.0015,
                month_end_boost: 1.5,
                quarter_end_boost: 2.0,
                min_income_frac: 0.0,
                max_income_frac: 0.0,
                fallback_amount: 0,
                min_percent: 0.0,
                max_percent: 0.0,
                is_positive: false,
                insurance_type: None,
                requires_decision: false,
                happiness_delta: -10,
                min_level: 2,
                persona_tags: vec![],
            },
        ];

        let card_templates = vec![
            DecisionCardTemplate {
                template_id: "coffee_habit".into(),
                category: "spending".into(),
                description: "Coworkers are heading out for expensive coffee".into(),
                persona_tags: vec![],
                min_level: 1,
                max_level: 99,
                frequency_weight: 3.0,
                options: vec![
                    CardOption {
                        option_id: "join".into(),
                        label: "Join them".into(),
                        cost: 700,
                        xp: 2,
                        coins: 0,
                        happiness: 3,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                    CardOption {
                        option_id: "skip".into(),
                        label: "Brew your own".into(),
                        cost: 0,
                        xp: 5,
                        coins: 2,
                        happiness: -1,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                ],
            },
            DecisionCardTemplate {
                template_id: "gym_membership".into(),
                category: "health".into(),
                description: "A gym down the street is running a signup deal".into(),
                persona_tags: vec![],
                min_level: 1,
                max_level: 99,
                frequency_weight: 1.5,
                options: vec![
                    CardOption {
                        option_id: "sign_up".into(),
                        label: "Sign up".into(),
                        cost: 3_500,
                        xp: 6,
                        coins: 0,
                        happiness: 4,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                    CardOption {
                        option_id: "pass".into(),
                        label: "Run outside instead".into(),
                        cost: 0,
                        xp: 4,
                        coins: 1,
                        happiness: 0,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                ],
            },
            DecisionCardTemplate {
                template_id: "phone_upgrade".into(),
                category: "spending".into(),
                description: "Your phone is slowing down and a new model just dropped".into(),
                persona_tags: vec![],
                min_level: 2,
                max_level: 99,
                frequency_weight: 1.0,
                options: vec![
                    CardOption {
                        option_id: "buy_new".into(),
                        label: "Buy the new model".into(),
                        cost: 90_000,
                        xp: 2,
                        coins: 0,
                        happiness: 6,
                        pay_with: PaymentSource::CreditCard,
                        consequence_template: None,
                    },
                    CardOption {
                        option_id: "repair".into(),
                        label: "Get it repaired".into(),
                        cost: 12_000,
                        xp: 8,
                        coins: 3,
                        happiness: 1,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                ],
            },
            DecisionCardTemplate {
                template_id: "friend_loan".into(),
                category: "social".into(),
                description: "A friend asks to borrow money until payday".into(),
                persona_tags: vec![],
                min_level: 1,
                max_level: 99,
                frequency_weight: 1.2,
                options: vec![
                    CardOption {
                        option_id: "lend".into(),
                        label: "Lend it".into(),
                        cost: 10_000,
                        xp: 3,
                        coins: 0,
                        happiness: 2,
                        pay_with: PaymentSource::Primary,
                        consequence_template: Some("friend_repays".into()),
                    },
                    CardOption {
                        option_id: "decline".into(),
                        label: "Politely decline".into(),
                        cost: 0,
                        xp: 4,
                        coins: 1,
                        happiness: -2,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                ],
            },
            DecisionCardTemplate {
                template_id: "friend_repays".into(),
                category: "social".into(),
                description: "Your friend pays you back, with thanks".into(),
                persona_tags: vec![],
                min_level: 1,
                max_level: 99,
                frequency_weight: 0.0, // only reachable as a consequence
                options: vec![CardOption {
                    option_id: "accept".into(),
                    label: "Accept".into(),
                    cost: -10_000,
                    xp: 5,
                    coins: 2,
                    happiness: 3,
                    pay_with: PaymentSource::Primary,
                    consequence_template: None,
                }],
            },
            DecisionCardTemplate {
                template_id: "side_gig".into(),
                category: "income".into(),
                description: "A weekend side gig is on offer".into(),
                persona_tags: vec!["student".into(), "adult".into()],
                min_level: 1,
                max_level: 99,
                frequency_weight: 1.5,
                options: vec![
                    CardOption {
                        option_id: "take_it".into(),
                        label: "Take the gig".into(),
                        cost: -15_000,
                        xp: 10,
                        coins: 3,
                        happiness: -2,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                    CardOption {
                        option_id: "rest".into(),
                        label: "Keep the weekend".into(),
                        cost: 0,
                        xp: 1,
                        coins: 0,
                        happiness: 3,
                        pay_with: PaymentSource::Primary,
                        consequence_template: None,
                    },
                ],
            },
        ];

        let insurance_products = [
            (
                "health".to_string(),
                InsuranceProduct {
                    insurance_type: "health".into(),
                    base_premium: 18_000,
                    deductible: 50_000,
                    coverage_rate: 0.8,
                },
            ),
            (
                "auto".to_string(),
                InsuranceProduct {
                    insurance_type: "auto".into(),
                    base_premium: 9_000,
                    deductible: 25_000,
                    coverage_rate: 0.7,
                },
            ),
            (
                "home".to_string(),
                InsuranceProduct {
                    insurance_type: "home".into(),
                    base_premium: 12_000,
                    deductible: 40_000,
                    coverage_rate: 0.75,
                },
            ),
        ]
        .into();

        let badges = vec![
            BadgeRule {
                badge_id: "first_decision".into(),
                tag: "first_card_decided".into(),
                reward_xp: 20,
                reward_coins: 10,
                grants_streak_shield: false,
            },
            BadgeRule {
                badge_id: "level_4_reached".into(),
                tag: "level_4_reached".into(),
                reward_xp: 0,
                reward_coins: 50,
                grants_streak_shield: true,
            },
            BadgeRule {
                badge_id: "first_investment".into(),
                tag: "first_investment".into(),
                reward_xp: 30,
                reward_coins: 15,
                grants_streak_shield: false,
            },
            BadgeRule {
                badge_id: "insured".into(),
                tag: "policy_purchased".into(),
                reward_xp: 15,
                reward_coins: 5,
                grants_streak_shield: false,
            },
            BadgeRule {
                badge_id: "taxes_filed".into(),
                tag: "tax_card_presented".into(),
                reward_xp: 10,
                reward_coins: 5,
                grants_streak_shield: false,
            },
        ];

        Self {
            difficulties,
            regions,
            levels,
            chi_weights: CreditHealthWeights {
                payment_history: 0.35,
                utilization: 0.30,
                account_age: 0.15,
                credit_mix: 0.10,
                new_inquiries: 0.10,
            },
            rounding: RoundingMode::HalfUp,
            bankruptcy: BankruptcyThresholds {
                trigger_ratio: -3.0,
                stress_ratio: -1.0,
                distress_ratio: -2.0,
                trigger_months: 3,
                exit_months: 2,
                recovery_days: 90,
                chi_floor: 300,
            },
            tax: TaxConfig {
                filing_month: 4,
                filing_day: 15,
                min_level: 3,
                tax_rate: 0.18,
                withholding_rate: 0.20,
                preparer_fee: 15_000,
            },
            event_curves,
            card_templates,
            insurance_products,
            badges,
            daily_cards_per_day: 2,
            card_recency_days: 7,
            consequence_min_days: 3,
            consequence_max_days: 17,
            card_expiry_days: 14,
            job_loss_recovery_days: 60,
            streak_gap_seconds: 24 * 60 * 60,
        }
    }
}
