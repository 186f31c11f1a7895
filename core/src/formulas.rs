//! Financial formula library.
//!
//! RULE: Every function here is pure — no I/O, no store access, no RNG.
//! Money goes in as integer cents and comes out as integer cents.
//! Rounding and weighting coefficients are parameters, never constants
//! baked into the math.

use crate::types::Cents;
use serde::{Deserialize, Serialize};

/// Rounding rule applied to interest postings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half away from zero.
    HalfUp,
    /// Banker's rounding (round half to even).
    HalfEven,
}

impl RoundingMode {
    pub fn round(self, value: f64) -> i64 {
        match self {
            Self::HalfUp => {
                if value >= 0.0 {
                    (value + 0.5).floor() as i64
                } else {
                    (value - 0.5).ceil() as i64
                }
            }
            Self::HalfEven => {
                let floor = value.floor();
                let frac = value - floor;
                if (frac - 0.5).abs() < f64::EPSILON {
                    let lower = floor as i64;
                    if lower % 2 == 0 {
                        lower
                    } else {
                        lower + 1
                    }
                } else {
                    Self::HalfUp.round(value)
                }
            }
        }
    }
}

/// Monthly-compounded savings interest: round(balance * rate% / 12).
pub fn savings_interest(balance: Cents, annual_rate_percent: f64, rounding: RoundingMode) -> Cents {
    if balance <= 0 {
        return 0;
    }
    rounding.round(balance as f64 * annual_rate_percent / 100.0 / 12.0)
}

/// Daily-accrued credit-card interest over one billing cycle.
pub fn credit_card_interest(
    outstanding: Cents,
    apr_percent: f64,
    days_in_cycle: u32,
    rounding: RoundingMode,
) -> Cents {
    if outstanding <= 0 {
        return 0;
    }
    rounding.round(outstanding as f64 * (apr_percent / 100.0 / 365.0) * days_in_cycle as f64)
}

/// Component factors feeding the credit-health index, each on 0–100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CreditHealthFactors {
    pub payment_history: f64,
    pub utilization: f64,
    pub account_age: f64,
    pub credit_mix: f64,
    pub new_inquiries: f64,
}

/// Weighting coefficients for the composite. Sums are normalized, so the
/// weights need not add to 1.0 exactly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreditHealthWeights {
    pub payment_history: f64,
    pub utilization: f64,
    pub account_age: f64,
    pub credit_mix: f64,
    pub new_inquiries: f64,
}

pub const CHI_MIN: i64 = 300;
pub const CHI_MAX: i64 = 850;

/// Weighted composite of the five factors, mapped onto 300–850.
pub fn credit_health_index(factors: &CreditHealthFactors, weights: &CreditHealthWeights) -> i64 {
    let total_weight = weights.payment_history
        + weights.utilization
        + weights.account_age
        + weights.credit_mix
        + weights.new_inquiries;
    if total_weight <= 0.0 {
        return CHI_MIN;
    }
    let composite = (factors.payment_history.clamp(0.0, 100.0) * weights.payment_history
        + factors.utilization.clamp(0.0, 100.0) * weights.utilization
        + factors.account_age.clamp(0.0, 100.0) * weights.account_age
        + factors.credit_mix.clamp(0.0, 100.0) * weights.credit_mix
        + factors.new_inquiries.clamp(0.0, 100.0) * weights.new_inquiries)
        / total_weight;
    let scaled = CHI_MIN as f64 + composite / 100.0 * (CHI_MAX - CHI_MIN) as f64;
    (scaled.round() as i64).clamp(CHI_MIN, CHI_MAX)
}

/// One budget category: what was allocated vs. what was actually spent.
#[derive(Debug, Clone, Copy)]
pub struct BudgetCategoryResult {
    pub budgeted: Cents,
    pub spent: Cents,
}

/// Aggregate adherence percentage, 0–100.
///
/// Staying at or under budget scores proportionally to how much of the
/// allocation was used; going over penalizes twice as hard per percentage
/// point of overrun.
pub fn budget_score(categories: &[BudgetCategoryResult]) -> i64 {
    let scored: Vec<f64> = categories
        .iter()
        .filter(|c| c.budgeted > 0)
        .map(|c| {
            let ratio = c.spent as f64 / c.budgeted as f64;
            if ratio <= 1.0 {
                // 100 at exactly on budget, degrading toward 50 at zero spend.
                50.0 + 50.0 * ratio
            } else {
                (100.0 - (ratio - 1.0) * 200.0).max(0.0)
            }
        })
        .collect();
    if scored.is_empty() {
        return 100;
    }
    (scored.iter().sum::<f64>() / scored.len() as f64).round() as i64
}

/// Progressive financial-health stages used by the bankruptcy machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BankruptcyStage {
    Normal,
    FinancialStress,
    FinancialDistress,
    Bankrupt,
}

impl BankruptcyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::FinancialStress => "financial_stress",
            Self::FinancialDistress => "financial_distress",
            Self::Bankrupt => "bankrupt",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "financial_stress" => Self::FinancialStress,
            "financial_distress" => Self::FinancialDistress,
            "bankrupt" => Self::Bankrupt,
            _ => Self::Normal,
        }
    }
}

/// Tunable bankruptcy trigger/exit thresholds. Game-balance values,
/// externalized on GameConfig rather than hard-coded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BankruptcyThresholds {
    /// Net-worth-to-monthly-income ratio at or below which the player is
    /// considered insolvent (e.g. -3.0 = three months of income underwater).
    pub trigger_ratio: f64,
    /// Ratio marking early stress (stage `financial_stress`).
    pub stress_ratio: f64,
    /// Ratio marking deep distress (stage `financial_distress`).
    pub distress_ratio: f64,
    /// Consecutive negative-net-worth months required to trigger.
    pub trigger_months: u32,
    /// Consecutive positive-net-worth months required to exit.
    pub exit_months: u32,
    /// Fixed-length recovery window, in days, set on entry.
    pub recovery_days: u32,
    /// Credit-health index is floored to this on entry.
    pub chi_floor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankruptcyAssessment {
    pub should_trigger: bool,
    pub should_exit: bool,
    pub stage: BankruptcyStage,
}

/// Classify the player's solvency and decide entry/exit transitions.
pub fn assess_bankruptcy(
    net_worth: Cents,
    monthly_income: Cents,
    consecutive_negative_months: u32,
    currently_bankrupt: bool,
    consecutive_positive_months: u32,
    thresholds: &BankruptcyThresholds,
) -> BankruptcyAssessment {
    if currently_bankrupt {
        return BankruptcyAssessment {
            should_trigger: false,
            should_exit: consecutive_positive_months >= thresholds.exit_months,
            stage: BankruptcyStage::Bankrupt,
        };
    }

    // With no income, any sustained negative net worth is insolvency.
    let ratio = if monthly_income > 0 {
        net_worth as f64 / monthly_income as f64
    } else if net_worth < 0 {
        thresholds.trigger_ratio
    } else {
        0.0
    };

    let should_trigger =
        ratio <= thresholds.trigger_ratio && consecutive_negative_months >= thresholds.trigger_months;

    let stage = if should_trigger {
        BankruptcyStage::Bankrupt
    } else if ratio <= thresholds.distress_ratio {
        BankruptcyStage::FinancialDistress
    } else if ratio <= thresholds.stress_ratio {
        BankruptcyStage::FinancialStress
    } else {
        BankruptcyStage::Normal
    };

    BankruptcyAssessment {
        should_trigger,
        should_exit: false,
        stage,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxAssessment {
    pub total_tax: Cents,
    pub total_withheld: Cents,
    /// Positive = refund due to the player, negative = bill owed.
    pub refund_or_bill: Cents,
}

/// Annual filing math over `months` of income at flat rates.
pub fn tax_assessment(
    monthly_income: Cents,
    months: u32,
    tax_rate: f64,
    withholding_rate: f64,
    rounding: RoundingMode,
) -> TaxAssessment {
    let gross = monthly_income as f64 * months as f64;
    let total_tax = rounding.round(gross * tax_rate);
    let total_withheld = rounding.round(gross * withholding_rate);
    TaxAssessment {
        total_tax,
        total_withheld,
        refund_or_bill: total_withheld - total_tax,
    }
}

/// An insurance policy's claim-relevant terms.
#[derive(Debug, Clone, Copy)]
pub struct PolicyTerms {
    pub deductible: Cents,
    /// Fraction of the post-deductible remainder the insurer pays, 0.0–1.0.
    pub coverage_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub covered: bool,
    pub insurance_paid: Cents,
    pub deductible_paid: Cents,
    pub player_pays: Cents,
}

/// Deductible first, then the remainder split by coverage rate.
pub fn process_claim(policy: PolicyTerms, claim_amount: Cents, rounding: RoundingMode) -> ClaimOutcome {
    if claim_amount <= 0 {
        return ClaimOutcome {
            covered: false,
            insurance_paid: 0,
            deductible_paid: 0,
            player_pays: 0,
        };
    }
    let deductible_paid = claim_amount.min(policy.deductible.max(0));
    let remainder = claim_amount - deductible_paid;
    let insurance_paid = rounding.round(remainder as f64 * policy.coverage_rate.clamp(0.0, 1.0));
    ClaimOutcome {
        covered: insurance_paid > 0,
        insurance_paid,
        deductible_paid,
        player_pays: deductible_paid + (remainder - insurance_paid),
    }
}

/// Scale a base premium by the difficulty's premium multiplier.
pub fn adjusted_premium(base_premium: Cents, difficulty_multiplier: f64, rounding: RoundingMode) -> Cents {
    rounding.round(base_premium as f64 * difficulty_multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_modes_differ_on_exact_halves() {
        assert_eq!(RoundingMode::HalfUp.round(2.5), 3);
        assert_eq!(RoundingMode::HalfUp.round(-2.5), -3);
        assert_eq!(RoundingMode::HalfEven.round(2.5), 2);
        assert_eq!(RoundingMode::HalfEven.round(3.5), 4);
        assert_eq!(RoundingMode::HalfEven.round(2.4), 2);
    }

    #[test]
    fn interest_is_zero_on_empty_or_negative_balances() {
        assert_eq!(savings_interest(0, 4.0, RoundingMode::HalfUp), 0);
        assert_eq!(savings_interest(-5_000, 4.0, RoundingMode::HalfUp), 0);
        assert_eq!(credit_card_interest(0, 22.0, 30, RoundingMode::HalfUp), 0);
        // $1200.00 at 4% APY pays $4.00 for the month.
        assert_eq!(savings_interest(120_000, 4.0, RoundingMode::HalfUp), 400);
    }

    #[test]
    fn card_interest_accrues_by_the_day() {
        let short = credit_card_interest(100_000, 22.0, 30, RoundingMode::HalfUp);
        let long = credit_card_interest(100_000, 22.0, 31, RoundingMode::HalfUp);
        assert!(long > short);
        assert_eq!(long, 1_868); // 100_000 * 0.22 / 365 * 31
    }

    #[test]
    fn chi_spans_the_full_band_and_clamps() {
        let weights = CreditHealthWeights {
            payment_history: 35.0,
            utilization: 30.0,
            account_age: 15.0,
            credit_mix: 10.0,
            new_inquiries: 10.0,
        };
        let perfect = CreditHealthFactors {
            payment_history: 100.0,
            utilization: 100.0,
            account_age: 100.0,
            credit_mix: 100.0,
            new_inquiries: 100.0,
        };
        assert_eq!(credit_health_index(&perfect, &weights), CHI_MAX);
        let ruined = CreditHealthFactors {
            payment_history: -40.0, // out-of-range input clamps to 0
            utilization: 0.0,
            account_age: 0.0,
            credit_mix: 0.0,
            new_inquiries: 0.0,
        };
        assert_eq!(credit_health_index(&ruined, &weights), CHI_MIN);
    }

    #[test]
    fn budget_score_rewards_use_and_punishes_overruns() {
        let cat = |budgeted, spent| BudgetCategoryResult { budgeted, spent };
        assert_eq!(budget_score(&[]), 100);
        assert_eq!(budget_score(&[cat(100_000, 100_000)]), 100);
        assert_eq!(budget_score(&[cat(100_000, 0)]), 50);
        // 5% over costs 10 points (double penalty per point of overrun).
        assert_eq!(budget_score(&[cat(100_000, 105_000)]), 90);
    }

    #[test]
    fn bankruptcy_needs_both_depth_and_duration() {
        let t = BankruptcyThresholds {
            trigger_ratio: -3.0,
            stress_ratio: -1.0,
            distress_ratio: -2.0,
            trigger_months: 3,
            exit_months: 2,
            recovery_days: 90,
            chi_floor: 300,
        };
        // Deep underwater but only two bad months: distressed, not bankrupt.
        let a = assess_bankruptcy(-1_200_000, 350_000, 2, false, 0, &t);
        assert!(!a.should_trigger);
        assert_eq!(a.stage, BankruptcyStage::FinancialDistress);

        let b = assess_bankruptcy(-1_200_000, 350_000, 3, false, 0, &t);
        assert!(b.should_trigger);

        // Shallow debt never triggers no matter how long it lasts.
        let c = assess_bankruptcy(-500_000, 350_000, 12, false, 0, &t);
        assert!(!c.should_trigger);
        assert_eq!(c.stage, BankruptcyStage::FinancialStress);

        // Exit needs the configured run of positive months.
        assert!(!assess_bankruptcy(10_000, 350_000, 0, true, 1, &t).should_exit);
        assert!(assess_bankruptcy(10_000, 350_000, 0, true, 2, &t).should_exit);
    }

    #[test]
    fn tax_refund_is_withholding_minus_liability() {
        let a = tax_assessment(350_000, 12, 0.18, 0.20, RoundingMode::HalfUp);
        assert_eq!(a.total_tax, 756_000);
        assert_eq!(a.total_withheld, 840_000);
        assert_eq!(a.refund_or_bill, 84_000);
    }

    #[test]
    fn claims_pay_deductible_first_then_split() {
        let policy = PolicyTerms {
            deductible: 50_000,
            coverage_rate: 0.8,
        };
        let big = process_claim(policy, 150_000, RoundingMode::HalfUp);
        assert!(big.covered);
        assert_eq!(big.deductible_paid, 50_000);
        assert_eq!(big.insurance_paid, 80_000);
        assert_eq!(big.player_pays, 70_000);

        // Entirely inside the deductible: the insurer pays nothing.
        let small = process_claim(policy, 30_000, RoundingMode::HalfUp);
        assert!(!small.covered);
        assert_eq!(small.insurance_paid, 0);
        assert_eq!(small.player_pays, 30_000);

        assert_eq!(adjusted_premium(18_000, 1.25, RoundingMode::HalfUp), 22_500);
    }
}
