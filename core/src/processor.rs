//! The action processor: one atomic unit of work per player action.
//!
//! Control flow for every action: take the write lock, load the game,
//! dispatch on the action kind, write balances/transactions/events/
//! ledgers through the store, then commit with an optimistic version
//! check. Any failure rolls the whole unit back — no action ever
//! partially applies.

use crate::action::{ActionError, GameAction, GameActionResult, GameStateView, RewardGrant};
use crate::cards::{
    event_decision_options, tax_filing_options, CardStatus, DecisionCardTemplate, PaymentSource,
    PendingCard, ScheduledCard,
};
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::event::{BudgetAllocation, GameEvent};
use crate::formulas::{
    self, adjusted_premium, assess_bankruptcy, credit_card_interest, credit_health_index,
    process_claim, savings_interest, tax_assessment, BankruptcyStage, BudgetCategoryResult,
    PolicyTerms,
};
use crate::game::{
    add_months, is_month_end, is_quarter_end, month_key, Account, AccountKind, AccountStatus,
    BillFrequency, EntityCounters, Game, ScheduledBill, TransactionRow,
};
use crate::rewards::{self, evaluate_badges};
use crate::rng::GameRng;
use crate::scenario::{
    roll_daily_events, select_daily_scenarios, EventKind, EventRollContext, ScenarioContext,
    TriggeredEvent,
};
use crate::store::GameStore;
use crate::types::Cents;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Inputs for starting a fresh game.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub game_id: String,
    pub user_id: String,
    pub persona: String,
    pub difficulty: String,
    pub region: String,
    pub start_date: NaiveDate,
    pub seed: String,
}

/// Accumulates the observable output of one action while it runs.
#[derive(Default)]
struct ActionCtx {
    events: Vec<GameEvent>,
    rewards: Vec<RewardGrant>,
    tags: HashSet<String>,
}

pub struct ActionProcessor {
    store: GameStore,
    config: GameConfig,
}

impl ActionProcessor {
    pub fn new(store: GameStore, config: GameConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ── Game creation ──────────────────────────────────────────

    /// Create a game with its onboarding accounts and starter bills.
    pub fn create_game(&self, params: &NewGame) -> GameResult<Game> {
        self.store.begin()?;
        match self.create_game_inner(params) {
            Ok(game) => {
                self.store.commit()?;
                info!("created game {} (persona={})", game.game_id, game.persona);
                Ok(game)
            }
            Err(e) => {
                if let Err(rb) = self.store.rollback() {
                    warn!("rollback failed after create_game error: {rb}");
                }
                Err(e)
            }
        }
    }

    fn create_game_inner(&self, params: &NewGame) -> GameResult<Game> {
        let difficulty = self.config.difficulty(&params.difficulty)?.clone();
        let region = self.config.region(&params.region)?.clone();

        let mut game = Game {
            game_id: params.game_id.clone(),
            user_id: params.user_id.clone(),
            persona: params.persona.clone(),
            difficulty: params.difficulty.clone(),
            region: params.region.clone(),
            currency: region.currency.clone(),
            date: params.start_date,
            level: 1,
            xp: 0,
            coins: 0,
            happiness: 70,
            net_worth: difficulty.starting_balance,
            chi: 650,
            chi_factors: formulas::CreditHealthFactors {
                payment_history: 80.0,
                utilization: 70.0,
                account_age: 50.0,
                credit_mix: 50.0,
                new_inquiries: 80.0,
            },
            budget_score: 100,
            streak_current: 0,
            streak_longest: 0,
            last_action_at: 0,
            bankruptcy_stage: BankruptcyStage::Normal,
            bankrupt_until: None,
            bankruptcy_count: 0,
            consecutive_negative_months: 0,
            consecutive_positive_months: 0,
            monthly_income: difficulty.monthly_salary,
            pre_jobloss_income: None,
            job_recovery_on: None,
            last_tax_year: None,
            entity_seq: EntityCounters::default(),
            version: 1,
            seed: params.seed.clone(),
        };
        self.store.insert_game(&game)?;

        // A minor persona banks on a prepaid card instead of checking.
        let primary_kind = if params.persona == "minor" {
            AccountKind::Prepaid
        } else {
            AccountKind::Checking
        };
        let primary_id = game.next_id("acct");
        self.store.insert_account(&Account {
            account_id: primary_id.clone(),
            game_id: game.game_id.clone(),
            kind: primary_kind,
            balance: 0,
            interest_rate: 0.0,
            credit_limit: None,
            principal: None,
            term_months: None,
            opened_on: game.date,
            status: AccountStatus::Active,
            insurance_type: None,
            premium: None,
            deductible: None,
            coverage_rate: None,
        })?;
        self.post(
            &mut game,
            &primary_id,
            difficulty.starting_balance,
            "opening_balance",
            "Opening balance",
            None,
            true,
        )?;

        let savings_id = game.next_id("acct");
        self.store.insert_account(&Account {
            account_id: savings_id,
            game_id: game.game_id.clone(),
            kind: AccountKind::Savings,
            balance: 0,
            interest_rate: self.config.savings_apy(&difficulty, &region),
            credit_limit: None,
            principal: None,
            term_months: None,
            opened_on: game.date,
            status: AccountStatus::Active,
            insurance_type: None,
            premium: None,
            deductible: None,
            coverage_rate: None,
        })?;

        if params.persona != "minor" {
            let cc_id = game.next_id("acct");
            self.store.insert_account(&Account {
                account_id: cc_id,
                game_id: game.game_id.clone(),
                kind: AccountKind::CreditCard,
                balance: 0,
                interest_rate: self.config.credit_card_apr(&difficulty, &region),
                credit_limit: Some(region.default_credit_limit),
                principal: None,
                term_months: None,
                opened_on: game.date,
                status: AccountStatus::Active,
                insurance_type: None,
                premium: None,
                deductible: None,
                coverage_rate: None,
            })?;
        }

        // Starter bills scale off the salary.
        let salary = difficulty.monthly_salary;
        let first_due = add_months(params.start_date.with_day(1).unwrap_or(params.start_date), 1);
        for (name, category, fraction) in [
            ("Rent", "housing", 0.30),
            ("Utilities", "utilities", 0.06),
            ("Phone", "phone", 0.02),
        ] {
            let bill_id = game.next_id("bill");
            self.store.insert_bill(&ScheduledBill {
                bill_id,
                game_id: game.game_id.clone(),
                name: name.to_string(),
                category: category.to_string(),
                amount: self.config.rounding.round(salary as f64 * fraction),
                frequency: BillFrequency::Monthly,
                next_due_on: first_due,
                autopay: true,
            })?;
        }

        self.store.append_event(
            &game.game_id,
            game.date,
            &GameEvent::GameCreated {
                date: game.date,
                persona: game.persona.clone(),
                difficulty: game.difficulty.clone(),
                region: game.region.clone(),
                seed: game.seed.clone(),
            },
        )?;

        game.net_worth = self.store.net_worth(&game.game_id)?;
        self.store.update_game(&game)?;
        game.version += 1;
        Ok(game)
    }

    // ── Action entry points ────────────────────────────────────

    /// Process one action using the real wall clock for streak timing.
    pub fn process(&self, game_id: &str, action: &GameAction) -> GameActionResult {
        self.process_at(game_id, action, Utc::now().timestamp())
    }

    /// Process one action with an injected wall-clock timestamp.
    pub fn process_at(&self, game_id: &str, action: &GameAction, now_unix: i64) -> GameActionResult {
        if let Err(e) = self.store.begin() {
            return GameActionResult::failure(e.code(), e.to_string());
        }

        let mut ctx = ActionCtx::default();
        let outcome = self
            .store
            .load_game(game_id)
            .and_then(|mut game| {
                self.run(&mut game, action, now_unix, &mut ctx)?;
                game.net_worth = self.store.net_worth(&game.game_id)?;
                self.evaluate_badges(&mut game, &mut ctx)?;
                self.store.update_game(&game)?;
                game.version += 1;
                Ok(game)
            })
            .and_then(|game| {
                self.store.commit()?;
                Ok(game)
            });

        match outcome {
            Ok(game) => {
                debug!("{} on {} ok, version {}", action.type_name(), game_id, game.version);
                let pending = self.store.pending_card_count(game_id).unwrap_or(0);
                GameActionResult {
                    success: true,
                    state: Some(state_view(&game, pending)),
                    events: ctx.events,
                    rewards: ctx.rewards,
                    errors: Vec::new(),
                }
            }
            Err(e) => {
                if let Err(rb) = self.store.rollback() {
                    warn!("rollback failed for {game_id}: {rb}");
                }
                debug!("{} on {} failed: {}", action.type_name(), game_id, e);
                let state = self
                    .store
                    .load_game(game_id)
                    .ok()
                    .map(|g| {
                        let pending = self.store.pending_card_count(game_id).unwrap_or(0);
                        state_view(&g, pending)
                    });
                GameActionResult {
                    success: false,
                    state,
                    events: Vec::new(),
                    rewards: Vec::new(),
                    errors: vec![ActionError {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    }],
                }
            }
        }
    }

    fn run(
        &self,
        game: &mut Game,
        action: &GameAction,
        now_unix: i64,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        match action {
            GameAction::AdvanceDay => self.advance_day(game, now_unix, ctx),
            GameAction::DecideCard { card_id, option_id } => {
                self.decide_card(game, card_id, option_id, ctx)
            }
            GameAction::Transfer {
                from_account,
                to_account,
                amount,
            } => self.transfer(game, from_account, to_account, *amount, ctx),
            GameAction::SetBudget { allocations } => self.set_budget(game, allocations, ctx),
            GameAction::OpenAccount {
                kind,
                principal,
                term_months,
            } => self.open_account(game, *kind, *principal, *term_months, ctx),
            GameAction::CloseAccount { account_id } => self.close_account(game, account_id, ctx),
            GameAction::Invest { amount } => self.invest(game, *amount, ctx),
            GameAction::SellInvestment { amount } => self.sell_investment(game, *amount, ctx),
            GameAction::BuyInsurance { insurance_type } => {
                self.buy_insurance(game, insurance_type, ctx)
            }
            GameAction::FileClaim {
                insurance_type,
                claim_amount,
            } => self.file_claim(game, insurance_type, *claim_amount, ctx),
        }
    }

    // ── Shared posting path ────────────────────────────────────

    /// Apply one balance delta plus its paired transaction row.
    /// Frozen accounts reject player-driven postings.
    #[allow(clippy::too_many_arguments)]
    fn post(
        &self,
        game: &mut Game,
        account_id: &str,
        delta: Cents,
        category: &str,
        description: &str,
        source_card: Option<&str>,
        automated: bool,
    ) -> GameResult<Cents> {
        let account = self.store.get_account(&game.game_id, account_id)?;
        if account.status == AccountStatus::Frozen {
            return Err(GameError::Validation(format!(
                "account '{account_id}' is frozen"
            )));
        }
        let new_balance = account.balance + delta;
        self.store.update_balance(&game.game_id, account_id, delta)?;
        self.store.insert_transaction(&TransactionRow {
            txn_id: game.next_id("txn"),
            account_id: account_id.to_string(),
            game_id: game.game_id.clone(),
            date: game.date,
            category: category.to_string(),
            amount: delta,
            balance_after: new_balance,
            description: description.to_string(),
            source_card: source_card.map(str::to_string),
            automated,
        })?;
        Ok(new_balance)
    }

    fn emit(&self, game: &Game, ctx: &mut ActionCtx, event: GameEvent) -> GameResult<()> {
        self.store.append_event(&game.game_id, game.date, &event)?;
        ctx.events.push(event);
        Ok(())
    }

    // ── Rewards ────────────────────────────────────────────────

    fn grant_xp(
        &self,
        game: &mut Game,
        ctx: &mut ActionCtx,
        base: i64,
        multiplier: f64,
        reason: &str,
    ) -> GameResult<()> {
        if base == 0 {
            return Ok(());
        }
        let award = rewards::award_xp(game, &self.config.levels, multiplier, base);
        self.store.append_xp(
            &game.game_id,
            &game.user_id,
            game.date,
            award.xp_granted + award.bonus_xp,
            reason,
            game.xp,
        )?;
        self.emit(
            game,
            ctx,
            GameEvent::XpAwarded {
                date: game.date,
                amount: award.xp_granted,
                reason: reason.to_string(),
                new_total: game.xp,
            },
        )?;
        ctx.rewards.push(RewardGrant::Xp {
            amount: award.xp_granted,
            reason: reason.to_string(),
        });
        if award.bonus_coins > 0 {
            self.store.append_coins(
                &game.game_id,
                &game.user_id,
                game.date,
                award.bonus_coins,
                "level_up",
                game.coins,
            )?;
        }
        for gain in &award.levels_gained {
            info!("{} reached level {}", game.game_id, gain.level);
            self.emit(
                game,
                ctx,
                GameEvent::LevelUp {
                    date: game.date,
                    new_level: gain.level,
                    xp_bonus: gain.xp_bonus,
                    coin_bonus: gain.coin_bonus,
                },
            )?;
            ctx.rewards.push(RewardGrant::LevelUp {
                level: gain.level,
                xp_bonus: gain.xp_bonus,
                coin_bonus: gain.coin_bonus,
            });
        }
        for tag in rewards::level_tags(&award.levels_gained) {
            ctx.tags.insert(tag);
        }
        Ok(())
    }

    fn grant_coins(
        &self,
        game: &mut Game,
        ctx: &mut ActionCtx,
        amount: i64,
        reason: &str,
    ) -> GameResult<()> {
        if amount == 0 {
            return Ok(());
        }
        game.coins += amount;
        self.store.append_coins(
            &game.game_id,
            &game.user_id,
            game.date,
            amount,
            reason,
            game.coins,
        )?;
        ctx.rewards.push(RewardGrant::Coins {
            amount,
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Fire badge rules for the tags this action produced. Badge XP can
    /// cross a level and imply new tags, so loop until a pass grants
    /// nothing new.
    fn evaluate_badges(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let mut earned = self.store.earned_badges(&game.game_id)?;
        loop {
            let hits: Vec<_> = evaluate_badges(&self.config.badges, &ctx.tags, &earned)
                .into_iter()
                .cloned()
                .collect();
            if hits.is_empty() {
                return Ok(());
            }
            for rule in hits {
                earned.insert(rule.badge_id.clone());
                self.store
                    .insert_earned_badge(&game.game_id, &rule.badge_id, game.date)?;
                self.emit(
                    game,
                    ctx,
                    GameEvent::BadgeEarned {
                        date: game.date,
                        badge_id: rule.badge_id.clone(),
                    },
                )?;
                ctx.rewards.push(RewardGrant::Badge {
                    badge_id: rule.badge_id.clone(),
                });
                let reason = format!("badge:{}", rule.badge_id);
                self.grant_xp(game, ctx, rule.reward_xp, 1.0, &reason)?;
                self.grant_coins(game, ctx, rule.reward_coins, &reason)?;
                if rule.grants_streak_shield {
                    self.store
                        .grant_streak_shield(&game.game_id, game.date, &reason)?;
                }
            }
        }
    }

    // ── advance_day ────────────────────────────────────────────

    fn advance_day(&self, game: &mut Game, now_unix: i64, ctx: &mut ActionCtx) -> GameResult<()> {
        let pending = self.store.pending_card_count(&game.game_id)?;
        if pending > 0 {
            return Err(GameError::PendingCards { count: pending });
        }

        if is_month_end(game.date) {
            self.run_month_end(game, ctx)?;
        }

        game.date += Duration::days(1);
        self.emit(game, ctx, GameEvent::DayAdvanced { date: game.date })?;

        self.charge_due_bills(game, ctx)?;
        self.check_job_recovery(game, ctx)?;
        self.roll_and_inject_events(game, ctx)?;
        self.check_tax_filing(game, ctx)?;
        self.sweep_scheduled_cards(game, ctx)?;
        self.generate_daily_cards(game, ctx)?;

        let difficulty = self.config.difficulty(&game.difficulty)?;
        let daily_xp = difficulty.daily_xp;
        let multiplier = difficulty.xp_multiplier;
        self.grant_xp(game, ctx, daily_xp, multiplier, "daily_play")?;

        self.update_streak(game, now_unix, ctx)?;
        game.last_action_at = now_unix;
        Ok(())
    }

    fn charge_due_bills(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let bills = self.store.bills_due(&game.game_id, game.date)?;
        if bills.is_empty() {
            return Ok(());
        }
        let primary = self.store.primary_liquid_account(&game.game_id)?;
        for bill in bills {
            let balance = self.post(
                game,
                &primary.account_id,
                -bill.amount,
                &bill.category,
                &bill.name,
                None,
                true,
            )?;
            self.emit(
                game,
                ctx,
                GameEvent::BillCharged {
                    date: game.date,
                    bill_id: bill.bill_id.clone(),
                    category: bill.category.clone(),
                    amount: bill.amount,
                    overdrawn: balance < 0,
                },
            )?;
            if balance < 0 {
                game.chi_factors.payment_history =
                    (game.chi_factors.payment_history - 5.0).max(0.0);
            }
            let next = bill.frequency.advance(bill.next_due_on);
            self.store.advance_bill(&game.game_id, &bill.bill_id, next)?;
        }
        Ok(())
    }

    fn check_job_recovery(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let Some(recovery_on) = game.job_recovery_on else {
            return Ok(());
        };
        if game.date < recovery_on {
            return Ok(());
        }
        let restored = game.pre_jobloss_income.unwrap_or(0);
        game.monthly_income = restored;
        game.pre_jobloss_income = None;
        game.job_recovery_on = None;
        game.nudge_happiness(8);
        self.emit(
            game,
            ctx,
            GameEvent::JobRecovered {
                date: game.date,
                income: restored,
            },
        )?;
        Ok(())
    }

    fn roll_and_inject_events(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let difficulty = self.config.difficulty(&game.difficulty)?;
        let roll_ctx = EventRollContext {
            difficulty_event_multiplier: difficulty.event_probability_multiplier,
            persona: game.persona.clone(),
            level: game.level,
            monthly_income: game.monthly_income,
            is_month_end: is_month_end(game.date),
            is_quarter_end: is_quarter_end(game.date),
        };
        let mut rng = GameRng::for_purpose(&game.seed, &format!("-events-{}", game.date));
        let triggered = roll_daily_events(&mut rng, &self.config.event_curves, &roll_ctx);
        for event in triggered {
            self.inject_event(game, event, ctx)?;
        }
        Ok(())
    }

    fn inject_event(&self, game: &mut Game, ev: TriggeredEvent, ctx: &mut ActionCtx) -> GameResult<()> {
        game.nudge_happiness(ev.happiness_delta);

        match ev.kind {
            EventKind::MarketCrash => return self.apply_market_crash(game, &ev, ctx),
            EventKind::Promotion => return self.apply_promotion(game, &ev, ctx),
            EventKind::RentHike | EventKind::UtilityHike => {
                return self.apply_bill_hike(game, &ev, ctx)
            }
            EventKind::JobLoss => return self.apply_job_loss(game, &ev, ctx),
            _ => {}
        }

        // Flat posting kinds. Insurance coverage shrinks what the player
        // owes before any decision card is built.
        let mut player_pays = ev.amount;
        let mut covered = false;
        if !ev.is_positive {
            if let Some(insurance_type) = &ev.insurance_type {
                if let Some(policy) = self.store.active_policy(&game.game_id, insurance_type)? {
                    let outcome = process_claim(
                        PolicyTerms {
                            deductible: policy.deductible.unwrap_or(0),
                            coverage_rate: policy.coverage_rate.unwrap_or(0.0),
                        },
                        ev.amount,
                        self.config.rounding,
                    );
                    covered = outcome.covered;
                    player_pays = outcome.player_pays;
                    self.emit(
                        game,
                        ctx,
                        GameEvent::ClaimSettled {
                            date: game.date,
                            insurance_type: insurance_type.clone(),
                            claim_amount: ev.amount,
                            insurance_paid: outcome.insurance_paid,
                            deductible_paid: outcome.deductible_paid,
                            player_pays: outcome.player_pays,
                        },
                    )?;
                }
            }
        }

        if ev.requires_decision && !ev.is_positive && player_pays > 0 {
            let card = PendingCard {
                card_id: game.next_id("card"),
                game_id: game.game_id.clone(),
                template_id: format!("event_{}", ev.kind.as_str()),
                category: ev.category.clone(),
                description: ev.description.clone(),
                presented_on: game.date,
                expires_on: game.date + Duration::days(self.config.card_expiry_days),
                status: CardStatus::Pending,
                chosen_option: None,
                options: event_decision_options(player_pays),
            };
            self.store.insert_pending_card(&card)?;
            self.emit(
                game,
                ctx,
                GameEvent::CardPresented {
                    date: game.date,
                    card_id: card.card_id.clone(),
                    template_id: card.template_id.clone(),
                    category: card.category.clone(),
                },
            )?;
            return Ok(());
        }

        let delta = if ev.is_positive { player_pays } else { -player_pays };
        if delta != 0 {
            let primary = self.store.primary_liquid_account(&game.game_id)?;
            self.post(
                game,
                &primary.account_id,
                delta,
                &ev.category,
                &ev.description,
                None,
                true,
            )?;
        }
        self.emit(
            game,
            ctx,
            GameEvent::RandomEventApplied {
                date: game.date,
                kind: ev.kind.as_str().to_string(),
                category: ev.category.clone(),
                amount: player_pays,
                is_positive: ev.is_positive,
                covered_by_insurance: covered,
                description: ev.description.clone(),
            },
        )?;
        Ok(())
    }

    fn apply_market_crash(
        &self,
        game: &mut Game,
        ev: &TriggeredEvent,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        let Some(account) = self
            .store
            .active_account_of_kind(&game.game_id, AccountKind::Investment)?
        else {
            return Ok(());
        };
        if account.balance <= 0 {
            return Ok(());
        }
        let percent = ev.percent.unwrap_or(0.0);
        let loss = self
            .config
            .rounding
            .round(account.balance as f64 * percent);
        if loss <= 0 {
            return Ok(());
        }
        self.post(
            game,
            &account.account_id,
            -loss,
            "market_loss",
            &ev.description,
            None,
            true,
        )?;
        self.emit(
            game,
            ctx,
            GameEvent::MarketCrashApplied {
                date: game.date,
                account_id: account.account_id.clone(),
                loss,
                percent,
            },
        )?;
        Ok(())
    }

    fn apply_promotion(
        &self,
        game: &mut Game,
        ev: &TriggeredEvent,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if game.monthly_income <= 0 {
            return Ok(());
        }
        let percent = ev.percent.unwrap_or(0.0);
        let old = game.monthly_income;
        let raise = self.config.rounding.round(old as f64 * percent);
        game.monthly_income = old + raise;
        self.emit(
            game,
            ctx,
            GameEvent::PromotionReceived {
                date: game.date,
                old_income: old,
                new_income: game.monthly_income,
            },
        )?;
        Ok(())
    }

    fn apply_bill_hike(
        &self,
        game: &mut Game,
        ev: &TriggeredEvent,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        let bills = self.store.bills_in_category(&game.game_id, &ev.category)?;
        let Some(bill) = bills.first() else {
            return Ok(());
        };
        let percent = ev.percent.unwrap_or(0.0);
        let raise = self.config.rounding.round(bill.amount as f64 * percent);
        if raise <= 0 {
            return Ok(());
        }
        let new_amount = bill.amount + raise;
        self.store
            .update_bill_amount(&game.game_id, &bill.bill_id, new_amount)?;
        self.emit(
            game,
            ctx,
            GameEvent::BillHiked {
                date: game.date,
                bill_id: bill.bill_id.clone(),
                category: bill.category.clone(),
                old_amount: bill.amount,
                new_amount,
            },
        )?;
        Ok(())
    }

    fn apply_job_loss(
        &self,
        game: &mut Game,
        _ev: &TriggeredEvent,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if game.monthly_income <= 0 || game.pre_jobloss_income.is_some() {
            return Ok(());
        }
        let recovery_on = game.date + Duration::days(self.config.job_loss_recovery_days);
        game.pre_jobloss_income = Some(game.monthly_income);
        game.monthly_income = 0;
        game.job_recovery_on = Some(recovery_on);
        self.emit(
            game,
            ctx,
            GameEvent::JobLost {
                date: game.date,
                recovery_on,
            },
        )?;
        Ok(())
    }

    fn check_tax_filing(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let tax = &self.config.tax;
        if game.level < tax.min_level {
            return Ok(());
        }
        if game.date.month() != tax.filing_month || game.date.day() != tax.filing_day {
            return Ok(());
        }
        let year = game.date.year();
        if game.last_tax_year == Some(year) {
            return Ok(());
        }

        let income = game.monthly_income.max(game.pre_jobloss_income.unwrap_or(0));
        let assessment = tax_assessment(
            income,
            12,
            tax.tax_rate,
            tax.withholding_rate,
            self.config.rounding,
        );
        game.last_tax_year = Some(year);

        let card = PendingCard {
            card_id: game.next_id("card"),
            game_id: game.game_id.clone(),
            template_id: "tax_filing".to_string(),
            category: "taxes".to_string(),
            description: format!("Time to file your {} taxes", year - 1),
            presented_on: game.date,
            expires_on: game.date + Duration::days(self.config.card_expiry_days),
            status: CardStatus::Pending,
            chosen_option: None,
            options: tax_filing_options(assessment.refund_or_bill, tax.preparer_fee),
        };
        self.store.insert_pending_card(&card)?;
        self.emit(
            game,
            ctx,
            GameEvent::TaxCardPresented {
                date: game.date,
                year,
                total_tax: assessment.total_tax,
                total_withheld: assessment.total_withheld,
                refund_or_bill: assessment.refund_or_bill,
            },
        )?;
        self.emit(
            game,
            ctx,
            GameEvent::CardPresented {
                date: game.date,
                card_id: card.card_id.clone(),
                template_id: card.template_id.clone(),
                category: card.category.clone(),
            },
        )?;
        ctx.tags.insert("tax_card_presented".to_string());
        Ok(())
    }

    fn sweep_scheduled_cards(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let due = self.store.due_scheduled_cards(&game.game_id, game.date)?;
        for sched in due {
            self.store
                .mark_scheduled_card_presented(&game.game_id, &sched.sched_id)?;
            let Some(template) = self
                .config
                .card_templates
                .iter()
                .find(|t| t.template_id == sched.template_id)
            else {
                warn!(
                    "scheduled card {} references unknown template {}",
                    sched.sched_id, sched.template_id
                );
                continue;
            };
            self.present_card(game, template, ctx)?;
        }
        Ok(())
    }

    fn present_card(
        &self,
        game: &mut Game,
        template: &DecisionCardTemplate,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        let card = PendingCard {
            card_id: game.next_id("card"),
            game_id: game.game_id.clone(),
            template_id: template.template_id.clone(),
            category: template.category.clone(),
            description: template.description.clone(),
            presented_on: game.date,
            expires_on: game.date + Duration::days(self.config.card_expiry_days),
            status: CardStatus::Pending,
            chosen_option: None,
            options: template.options.clone(),
        };
        self.store.insert_pending_card(&card)?;
        self.emit(
            game,
            ctx,
            GameEvent::CardPresented {
                date: game.date,
                card_id: card.card_id.clone(),
                template_id: card.template_id.clone(),
                category: card.category.clone(),
            },
        )?;
        Ok(())
    }

    fn generate_daily_cards(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let since = game.date - Duration::days(self.config.card_recency_days);
        let recent = self.store.recent_template_ids(&game.game_id, since)?;
        let scenario_ctx = ScenarioContext {
            persona: game.persona.clone(),
            level: game.level,
            recent_template_ids: recent,
            recent_categories: Vec::new(),
        };
        let mut rng = GameRng::for_purpose(&game.seed, &format!("-cards-{}", game.date));
        let picks = select_daily_scenarios(
            &mut rng,
            &self.config.card_templates,
            &scenario_ctx,
            self.config.daily_cards_per_day,
        );
        let picks: Vec<DecisionCardTemplate> = picks.into_iter().cloned().collect();
        for template in &picks {
            self.present_card(game, template, ctx)?;
        }
        Ok(())
    }

    fn update_streak(&self, game: &mut Game, now_unix: i64, ctx: &mut ActionCtx) -> GameResult<()> {
        let gap = now_unix - game.last_action_at;
        let mut shield_consumed = false;
        if game.last_action_at > 0 && gap > self.config.streak_gap_seconds {
            if self.store.consume_streak_shield(&game.game_id)? {
                shield_consumed = true;
                game.streak_current += 1;
            } else {
                game.streak_current = 1;
            }
        } else {
            game.streak_current += 1;
        }
        game.streak_longest = game.streak_longest.max(game.streak_current);
        self.emit(
            game,
            ctx,
            GameEvent::StreakUpdated {
                date: game.date,
                current: game.streak_current,
                longest: game.streak_longest,
                shield_consumed,
            },
        )?;
        Ok(())
    }

    // ── Month-end batch ────────────────────────────────────────

    /// The ordered month-end workflow, run while `game.date` is still
    /// the last day of the closing month.
    fn run_month_end(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let month = month_key(game.date);
        info!("month-end batch for {} ({month})", game.game_id);
        let difficulty = self.config.difficulty(&game.difficulty)?.clone();

        // 1. Salary.
        if game.monthly_income > 0 {
            let primary = self.store.primary_liquid_account(&game.game_id)?;
            self.post(
                game,
                &primary.account_id,
                game.monthly_income,
                "salary",
                "Monthly salary",
                None,
                true,
            )?;
            self.emit(
                game,
                ctx,
                GameEvent::SalaryDeposited {
                    date: game.date,
                    account_id: primary.account_id.clone(),
                    amount: game.monthly_income,
                },
            )?;
        }

        // 2. Remaining due bills.
        self.charge_due_bills(game, ctx)?;

        // 3–4. Interest postings.
        let days_in_month = game.date.day();
        for account in self.store.open_accounts(&game.game_id)? {
            if account.status != AccountStatus::Active {
                continue;
            }
            match account.kind {
                AccountKind::Savings => {
                    let interest =
                        savings_interest(account.balance, account.interest_rate, self.config.rounding);
                    if interest > 0 {
                        self.post(
                            game,
                            &account.account_id,
                            interest,
                            "interest",
                            "Savings interest",
                            None,
                            true,
                        )?;
                        self.emit(
                            game,
                            ctx,
                            GameEvent::InterestPosted {
                                date: game.date,
                                account_id: account.account_id.clone(),
                                kind: "savings".to_string(),
                                amount: interest,
                            },
                        )?;
                    }
                }
                AccountKind::CreditCard => {
                    let outstanding = -account.balance;
                    let interest = credit_card_interest(
                        outstanding,
                        account.interest_rate,
                        days_in_month,
                        self.config.rounding,
                    );
                    if interest > 0 {
                        self.post(
                            game,
                            &account.account_id,
                            -interest,
                            "interest",
                            "Credit card interest",
                            None,
                            true,
                        )?;
                        self.emit(
                            game,
                            ctx,
                            GameEvent::InterestPosted {
                                date: game.date,
                                account_id: account.account_id.clone(),
                                kind: "credit_card".to_string(),
                                amount: -interest,
                            },
                        )?;
                    }
                }
                _ => {}
            }
        }

        // 5. Net worth and solvency month counters.
        game.net_worth = self.store.net_worth(&game.game_id)?;
        if game.net_worth < 0 {
            game.consecutive_negative_months += 1;
            game.consecutive_positive_months = 0;
        } else {
            game.consecutive_positive_months += 1;
            game.consecutive_negative_months = 0;
        }

        // 6. Credit-health index from updated factors.
        self.recompute_chi_factors(game, &month)?;
        game.chi = credit_health_index(&game.chi_factors, &self.config.chi_weights);
        if game.is_bankrupt() {
            game.chi = game.chi.min(self.config.bankruptcy.chi_floor);
        }

        // 7. Budget score from this month's categorized spend.
        let allocations = self.store.budget_allocations(&game.game_id)?;
        let spend = self.store.month_spend_by_category(&game.game_id, &month)?;
        let categories: Vec<BudgetCategoryResult> = allocations
            .iter()
            .map(|a| BudgetCategoryResult {
                budgeted: a.amount,
                spent: spend
                    .iter()
                    .find(|(c, _)| c == &a.category)
                    .map(|(_, s)| *s)
                    .unwrap_or(0),
            })
            .collect();
        game.budget_score = formulas::budget_score(&categories);

        // 8. Monthly report.
        let income = self.store.month_income(&game.game_id, &month)?;
        let expenses = self.store.month_expenses(&game.game_id, &month)?;
        self.store.upsert_monthly_report(&crate::store::MonthlyReport {
            game_id: game.game_id.clone(),
            month: month.clone(),
            net_worth: game.net_worth,
            income,
            expenses,
            chi: game.chi,
            budget_score: game.budget_score,
            created_on: game.date,
        })?;

        // 9. Month-end XP bonus.
        self.grant_xp(
            game,
            ctx,
            difficulty.month_end_xp_bonus,
            difficulty.xp_multiplier,
            "month_end",
        )?;

        // 10. Streak metric ticks.
        for (metric, passed) in [
            ("chi_750", game.chi >= 750),
            ("budget_90", game.budget_score >= 90),
        ] {
            let prev = self.store.last_streak_tick(&game.game_id, metric)?.unwrap_or(0);
            let count = if passed { prev + 1 } else { 0 };
            self.emit(
                game,
                ctx,
                GameEvent::StreakTick {
                    date: game.date,
                    metric: metric.to_string(),
                    passed,
                    count,
                },
            )?;
        }

        // 11. Insurance premiums.
        self.charge_premiums(game, ctx)?;

        // 12. Bankruptcy assessment.
        self.run_bankruptcy_machine(game, ctx)?;

        self.emit(
            game,
            ctx,
            GameEvent::MonthEndCompleted {
                date: game.date,
                month,
                net_worth: game.net_worth,
                chi: game.chi,
                budget_score: game.budget_score,
            },
        )?;
        Ok(())
    }

    fn recompute_chi_factors(&self, game: &mut Game, month: &str) -> GameResult<()> {
        let accounts = self.store.open_accounts(&game.game_id)?;

        // Utilization: share of credit limits currently drawn.
        let (mut used, mut limit) = (0i64, 0i64);
        for a in accounts.iter().filter(|a| a.kind == AccountKind::CreditCard) {
            used += (-a.balance).max(0);
            limit += a.credit_limit.unwrap_or(0);
        }
        game.chi_factors.utilization = if limit > 0 {
            ((1.0 - used as f64 / limit as f64) * 100.0).clamp(0.0, 100.0)
        } else {
            70.0
        };

        // Account age: average months open, saturating at two years.
        if !accounts.is_empty() {
            let total_months: i64 = accounts
                .iter()
                .map(|a| {
                    let days = (game.date - a.opened_on).num_days();
                    days / 30
                })
                .sum();
            let avg = total_months as f64 / accounts.len() as f64;
            game.chi_factors.account_age = (avg / 24.0 * 100.0).clamp(0.0, 100.0);
        }

        // Credit mix: distinct account kinds held.
        let kinds: HashSet<&str> = accounts.iter().map(|a| a.kind.as_str()).collect();
        game.chi_factors.credit_mix = (kinds.len() as f64 / 5.0 * 100.0).clamp(0.0, 100.0);

        // New inquiries: accounts opened this month drag the factor down.
        let opened = self.store.accounts_opened_in_month(&game.game_id, month)?;
        game.chi_factors.new_inquiries = (100.0 - opened as f64 * 25.0).clamp(0.0, 100.0);

        // Payment history drifts up slowly while solvent; overdraft
        // penalties are applied where bills are charged.
        if game.net_worth >= 0 {
            game.chi_factors.payment_history =
                (game.chi_factors.payment_history + 2.0).min(100.0);
        } else {
            game.chi_factors.payment_history =
                (game.chi_factors.payment_history - 3.0).max(0.0);
        }
        Ok(())
    }

    fn charge_premiums(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let policies: Vec<Account> = self
            .store
            .open_accounts(&game.game_id)?
            .into_iter()
            .filter(|a| a.kind == AccountKind::Insurance && a.status == AccountStatus::Active)
            .collect();
        if policies.is_empty() {
            return Ok(());
        }
        let primary = self.store.primary_liquid_account(&game.game_id)?;
        for policy in policies {
            let premium = policy.premium.unwrap_or(0);
            if premium <= 0 {
                continue;
            }
            let insurance_type = policy.insurance_type.clone().unwrap_or_default();
            self.post(
                game,
                &primary.account_id,
                -premium,
                "insurance",
                &format!("{insurance_type} insurance premium"),
                None,
                true,
            )?;
            self.emit(
                game,
                ctx,
                GameEvent::PremiumCharged {
                    date: game.date,
                    account_id: policy.account_id.clone(),
                    insurance_type,
                    amount: premium,
                },
            )?;
        }
        Ok(())
    }

    fn run_bankruptcy_machine(&self, game: &mut Game, ctx: &mut ActionCtx) -> GameResult<()> {
        let assessment = assess_bankruptcy(
            game.net_worth,
            game.monthly_income,
            game.consecutive_negative_months,
            game.is_bankrupt(),
            game.consecutive_positive_months,
            &self.config.bankruptcy,
        );

        if game.is_bankrupt() {
            let window_over = game.bankrupt_until.is_some_and(|d| game.date >= d);
            if assessment.should_exit && window_over {
                info!("{} exits bankruptcy on {}", game.game_id, game.date);
                self.store.unfreeze_all(&game.game_id)?;
                game.bankruptcy_stage = BankruptcyStage::Normal;
                game.bankrupt_until = None;
                game.consecutive_negative_months = 0;
                self.emit(game, ctx, GameEvent::BankruptcyExited { date: game.date })?;
                self.emit(
                    game,
                    ctx,
                    GameEvent::BankruptcyStageChanged {
                        date: game.date,
                        stage: BankruptcyStage::Normal.as_str().to_string(),
                    },
                )?;
            }
            return Ok(());
        }

        if assessment.should_trigger {
            info!("{} enters bankruptcy on {}", game.game_id, game.date);
            let frozen = self.store.freeze_for_bankruptcy(&game.game_id)?;
            game.bankruptcy_stage = BankruptcyStage::Bankrupt;
            game.bankruptcy_count += 1;
            game.bankrupt_until =
                Some(game.date + Duration::days(self.config.bankruptcy.recovery_days as i64));
            game.chi = game.chi.min(self.config.bankruptcy.chi_floor);
            game.consecutive_positive_months = 0;
            self.emit(
                game,
                ctx,
                GameEvent::BankruptcyEntered {
                    date: game.date,
                    recovery_until: game.bankrupt_until.unwrap_or(game.date),
                    accounts_frozen: frozen,
                },
            )?;
            self.emit(
                game,
                ctx,
                GameEvent::BankruptcyStageChanged {
                    date: game.date,
                    stage: BankruptcyStage::Bankrupt.as_str().to_string(),
                },
            )?;
        } else if assessment.stage != game.bankruptcy_stage {
            game.bankruptcy_stage = assessment.stage;
            self.emit(
                game,
                ctx,
                GameEvent::BankruptcyStageChanged {
                    date: game.date,
                    stage: assessment.stage.as_str().to_string(),
                },
            )?;
        }
        Ok(())
    }

    // ── decide_card ────────────────────────────────────────────

    fn decide_card(
        &self,
        game: &mut Game,
        card_id: &str,
        option_id: &str,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        let card = self.store.get_pending_card(&game.game_id, card_id)?;
        let option = card
            .option(option_id)
            .ok_or_else(|| GameError::InvalidOption {
                card_id: card_id.to_string(),
                option_id: option_id.to_string(),
            })?
            .clone();

        if option.cost != 0 {
            let account = self.resolve_payment_account(game, option.pay_with)?;
            self.post(
                game,
                &account.account_id,
                -option.cost,
                &card.category,
                &card.description,
                Some(card_id),
                false,
            )?;
        }

        self.store.resolve_card(&game.game_id, card_id, option_id)?;
        game.nudge_happiness(option.happiness);
        self.emit(
            game,
            ctx,
            GameEvent::CardResolved {
                date: game.date,
                card_id: card_id.to_string(),
                option_id: option_id.to_string(),
                cost: option.cost,
                xp: option.xp,
                coins: option.coins,
                happiness: option.happiness,
            },
        )?;

        let difficulty = self.config.difficulty(&game.difficulty)?;
        let multiplier = difficulty.xp_multiplier;
        let reason = format!("card:{}", card.template_id);
        self.grant_xp(game, ctx, option.xp, multiplier, &reason)?;
        self.grant_coins(game, ctx, option.coins, &reason)?;

        if let Some(template_id) = &option.consequence_template {
            let mut rng =
                GameRng::for_purpose(&game.seed, &format!("-consequence-{}", game.date));
            let delay = rng.range_i64(
                self.config.consequence_min_days,
                self.config.consequence_max_days,
            );
            let due_on = game.date + Duration::days(delay);
            let sched = ScheduledCard {
                sched_id: game.next_id("sched"),
                game_id: game.game_id.clone(),
                template_id: template_id.clone(),
                due_on,
                source: "card_consequence".to_string(),
            };
            self.store.insert_scheduled_card(&sched)?;
            self.emit(
                game,
                ctx,
                GameEvent::CardScheduled {
                    date: game.date,
                    template_id: template_id.clone(),
                    due_on,
                    source: sched.source.clone(),
                },
            )?;
        }

        ctx.tags.insert("card_decided".to_string());
        if self.store.resolved_card_count(&game.game_id)? == 1 {
            ctx.tags.insert("first_card_decided".to_string());
        }
        Ok(())
    }

    /// Card costs land on the primary account unless the option routes
    /// them to credit (falling back to primary when no card is active).
    fn resolve_payment_account(&self, game: &Game, source: PaymentSource) -> GameResult<Account> {
        if source == PaymentSource::CreditCard {
            if let Some(cc) = self
                .store
                .active_account_of_kind(&game.game_id, AccountKind::CreditCard)?
            {
                return Ok(cc);
            }
        }
        self.store.primary_liquid_account(&game.game_id)
    }

    // ── transfer ───────────────────────────────────────────────

    fn transfer(
        &self,
        game: &mut Game,
        from_account: &str,
        to_account: &str,
        amount: Cents,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if amount <= 0 {
            return Err(GameError::Validation(
                "transfer amount must be positive".to_string(),
            ));
        }
        if from_account == to_account {
            return Err(GameError::Validation(
                "cannot transfer to the same account".to_string(),
            ));
        }
        let from = self.store.get_account(&game.game_id, from_account)?;
        let to = self.store.get_account(&game.game_id, to_account)?;
        if from.status != AccountStatus::Active || to.status != AccountStatus::Active {
            return Err(GameError::Validation(
                "both accounts must be active".to_string(),
            ));
        }
        if from.balance < amount {
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: from.balance,
            });
        }

        let description = format!("Transfer {from_account} -> {to_account}");
        self.post(game, from_account, -amount, "transfer", &description, None, false)?;
        self.post(game, to_account, amount, "transfer", &description, None, false)?;
        self.emit(
            game,
            ctx,
            GameEvent::TransferCompleted {
                date: game.date,
                from_account: from_account.to_string(),
                to_account: to_account.to_string(),
                amount,
            },
        )?;
        Ok(())
    }

    // ── set_budget ─────────────────────────────────────────────

    fn set_budget(
        &self,
        game: &mut Game,
        allocations: &[BudgetAllocation],
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if allocations.is_empty() {
            return Err(GameError::Validation(
                "budget must name at least one category".to_string(),
            ));
        }
        for a in allocations {
            if a.category.is_empty() || a.amount < 0 {
                return Err(GameError::Validation(format!(
                    "invalid budget allocation for '{}'",
                    a.category
                )));
            }
        }
        self.store
            .replace_budget_allocations(&game.game_id, allocations)?;
        self.emit(
            game,
            ctx,
            GameEvent::BudgetSet {
                date: game.date,
                allocations: allocations.to_vec(),
            },
        )?;
        Ok(())
    }

    // ── open_account / close_account ───────────────────────────

    fn open_account(
        &self,
        game: &mut Game,
        kind: AccountKind,
        principal: Option<Cents>,
        term_months: Option<u32>,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if kind == AccountKind::Insurance {
            return Err(GameError::Validation(
                "insurance accounts are opened via buy_insurance".to_string(),
            ));
        }
        let difficulty = self.config.difficulty(&game.difficulty)?.clone();
        let region = self.config.region(&game.region)?.clone();

        let (rate, credit_limit, opening_balance) = match kind {
            AccountKind::Checking | AccountKind::Prepaid => (0.0, None, 0),
            AccountKind::Savings => (self.config.savings_apy(&difficulty, &region), None, 0),
            AccountKind::CreditCard => (
                self.config.credit_card_apr(&difficulty, &region),
                Some(region.default_credit_limit),
                0,
            ),
            AccountKind::Loan => (region.loan_rate, None, 0),
            AccountKind::Mortgage => (region.mortgage_rate, None, 0),
            AccountKind::Investment => (region.investment_return, None, 0),
            AccountKind::Insurance => unreachable!(),
        };

        let principal = if kind.is_loan_like() {
            let p = principal.ok_or_else(|| {
                GameError::Validation(format!("{} requires a principal", kind.as_str()))
            })?;
            if p <= 0 {
                return Err(GameError::Validation(
                    "principal must be positive".to_string(),
                ));
            }
            Some(p)
        } else {
            None
        };

        let account_id = game.next_id("acct");
        self.store.insert_account(&Account {
            account_id: account_id.clone(),
            game_id: game.game_id.clone(),
            kind,
            balance: opening_balance,
            interest_rate: rate,
            credit_limit,
            principal,
            term_months: if kind.is_loan_like() { term_months } else { None },
            opened_on: game.date,
            status: AccountStatus::Active,
            insurance_type: None,
            premium: None,
            deductible: None,
            coverage_rate: None,
        })?;

        // Loan-like kinds disburse the principal into the primary
        // account and carry the debt as a negative balance.
        if let Some(p) = principal {
            self.post(
                game,
                &account_id,
                -p,
                "loan_principal",
                "Loan principal",
                None,
                true,
            )?;
            let primary = self.store.primary_liquid_account(&game.game_id)?;
            self.post(
                game,
                &primary.account_id,
                p,
                "loan_disbursement",
                "Loan disbursement",
                None,
                true,
            )?;
        }

        self.emit(
            game,
            ctx,
            GameEvent::AccountOpened {
                date: game.date,
                account_id,
                kind: kind.as_str().to_string(),
                interest_rate: rate,
            },
        )?;
        ctx.tags.insert("account_opened".to_string());
        Ok(())
    }

    fn close_account(&self, game: &mut Game, account_id: &str, ctx: &mut ActionCtx) -> GameResult<()> {
        let account = self.store.get_account(&game.game_id, account_id)?;
        if account.status == AccountStatus::Closed {
            return Err(GameError::AccountNotFound(account_id.to_string()));
        }
        if account.balance < 0 {
            return Err(GameError::OutstandingBalance(account_id.to_string()));
        }

        let primary = self.store.primary_liquid_account(&game.game_id)?;
        let mut swept = 0;
        if account.balance > 0 && account.account_id != primary.account_id {
            swept = account.balance;
            let description = format!("Closing sweep from {account_id}");
            self.post(game, account_id, -swept, "transfer", &description, None, true)?;
            self.post(game, &primary.account_id, swept, "transfer", &description, None, true)?;
        }
        self.store
            .set_account_status(&game.game_id, account_id, AccountStatus::Closed)?;
        self.emit(
            game,
            ctx,
            GameEvent::AccountClosed {
                date: game.date,
                account_id: account_id.to_string(),
                swept_to_primary: swept,
            },
        )?;
        Ok(())
    }

    // ── invest / sell_investment ───────────────────────────────

    fn invest(&self, game: &mut Game, amount: Cents, ctx: &mut ActionCtx) -> GameResult<()> {
        if amount <= 0 {
            return Err(GameError::Validation(
                "investment amount must be positive".to_string(),
            ));
        }
        let primary = self.store.primary_liquid_account(&game.game_id)?;
        if primary.balance < amount {
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: primary.balance,
            });
        }

        let existing = self
            .store
            .open_accounts(&game.game_id)?
            .into_iter()
            .find(|a| a.kind == AccountKind::Investment);
        let account_id = match existing {
            Some(a) if a.status == AccountStatus::Frozen => {
                return Err(GameError::Validation(
                    "investment account is frozen".to_string(),
                ));
            }
            Some(a) => a.account_id,
            None => {
                let region = self.config.region(&game.region)?;
                let account_id = game.next_id("acct");
                self.store.insert_account(&Account {
                    account_id: account_id.clone(),
                    game_id: game.game_id.clone(),
                    kind: AccountKind::Investment,
                    balance: 0,
                    interest_rate: region.investment_return,
                    credit_limit: None,
                    principal: None,
                    term_months: None,
                    opened_on: game.date,
                    status: AccountStatus::Active,
                    insurance_type: None,
                    premium: None,
                    deductible: None,
                    coverage_rate: None,
                })?;
                self.emit(
                    game,
                    ctx,
                    GameEvent::AccountOpened {
                        date: game.date,
                        account_id: account_id.clone(),
                        kind: AccountKind::Investment.as_str().to_string(),
                        interest_rate: region.investment_return,
                    },
                )?;
                ctx.tags.insert("first_investment".to_string());
                account_id
            }
        };

        self.post(game, &primary.account_id, -amount, "transfer", "Investment buy", None, false)?;
        self.post(game, &account_id, amount, "transfer", "Investment buy", None, false)?;
        self.emit(
            game,
            ctx,
            GameEvent::InvestmentMade {
                date: game.date,
                account_id,
                amount,
            },
        )?;
        Ok(())
    }

    fn sell_investment(&self, game: &mut Game, amount: Cents, ctx: &mut ActionCtx) -> GameResult<()> {
        if amount <= 0 {
            return Err(GameError::Validation(
                "sale amount must be positive".to_string(),
            ));
        }
        let account = self
            .store
            .active_account_of_kind(&game.game_id, AccountKind::Investment)?
            .ok_or_else(|| GameError::Validation("no investment account to sell from".to_string()))?;
        if account.balance < amount {
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: account.balance,
            });
        }
        let primary = self.store.primary_liquid_account(&game.game_id)?;
        self.post(game, &account.account_id, -amount, "transfer", "Investment sale", None, false)?;
        self.post(game, &primary.account_id, amount, "transfer", "Investment sale", None, false)?;
        self.emit(
            game,
            ctx,
            GameEvent::InvestmentSold {
                date: game.date,
                account_id: account.account_id.clone(),
                amount,
            },
        )?;
        Ok(())
    }

    // ── buy_insurance / file_claim ─────────────────────────────

    fn buy_insurance(&self, game: &mut Game, insurance_type: &str, ctx: &mut ActionCtx) -> GameResult<()> {
        let product = self
            .config
            .insurance_products
            .get(insurance_type)
            .ok_or_else(|| {
                GameError::Validation(format!("unknown insurance type '{insurance_type}'"))
            })?;
        if self
            .store
            .active_policy(&game.game_id, insurance_type)?
            .is_some()
        {
            return Err(GameError::AlreadyInsured(insurance_type.to_string()));
        }

        let difficulty = self.config.difficulty(&game.difficulty)?;
        let premium = adjusted_premium(
            product.base_premium,
            difficulty.premium_multiplier,
            self.config.rounding,
        );
        let primary = self.store.primary_liquid_account(&game.game_id)?;
        if primary.balance < premium {
            return Err(GameError::InsufficientFunds {
                needed: premium,
                available: primary.balance,
            });
        }

        let account_id = game.next_id("acct");
        self.store.insert_account(&Account {
            account_id: account_id.clone(),
            game_id: game.game_id.clone(),
            kind: AccountKind::Insurance,
            balance: 0,
            interest_rate: 0.0,
            credit_limit: None,
            principal: None,
            term_months: None,
            opened_on: game.date,
            status: AccountStatus::Active,
            insurance_type: Some(insurance_type.to_string()),
            premium: Some(premium),
            deductible: Some(product.deductible),
            coverage_rate: Some(product.coverage_rate),
        })?;
        self.post(
            game,
            &primary.account_id,
            -premium,
            "insurance",
            &format!("{insurance_type} insurance premium"),
            None,
            false,
        )?;
        self.emit(
            game,
            ctx,
            GameEvent::PolicyPurchased {
                date: game.date,
                account_id,
                insurance_type: insurance_type.to_string(),
                premium,
            },
        )?;
        ctx.tags.insert("policy_purchased".to_string());
        Ok(())
    }

    fn file_claim(
        &self,
        game: &mut Game,
        insurance_type: &str,
        claim_amount: Cents,
        ctx: &mut ActionCtx,
    ) -> GameResult<()> {
        if claim_amount <= 0 {
            return Err(GameError::Validation(
                "claim amount must be positive".to_string(),
            ));
        }
        let policy = self
            .store
            .active_policy(&game.game_id, insurance_type)?
            .ok_or_else(|| GameError::NoPolicy(insurance_type.to_string()))?;
        let outcome = process_claim(
            PolicyTerms {
                deductible: policy.deductible.unwrap_or(0),
                coverage_rate: policy.coverage_rate.unwrap_or(0.0),
            },
            claim_amount,
            self.config.rounding,
        );
        if outcome.insurance_paid > 0 {
            let primary = self.store.primary_liquid_account(&game.game_id)?;
            self.post(
                game,
                &primary.account_id,
                outcome.insurance_paid,
                "claim_payout",
                &format!("{insurance_type} claim payout"),
                None,
                false,
            )?;
        }
        self.emit(
            game,
            ctx,
            GameEvent::ClaimSettled {
                date: game.date,
                insurance_type: insurance_type.to_string(),
                claim_amount,
                insurance_paid: outcome.insurance_paid,
                deductible_paid: outcome.deductible_paid,
                player_pays: outcome.player_pays,
            },
        )?;
        Ok(())
    }
}

fn state_view(game: &Game, pending_cards: usize) -> GameStateView {
    GameStateView {
        game_id: game.game_id.clone(),
        date: game.date,
        level: game.level,
        xp: game.xp,
        coins: game.coins,
        happiness: game.happiness,
        net_worth: game.net_worth,
        chi: game.chi,
        budget_score: game.budget_score,
        streak_current: game.streak_current,
        streak_longest: game.streak_longest,
        bankruptcy_stage: game.bankruptcy_stage.as_str().to_string(),
        pending_cards,
        version: game.version,
    }
}
