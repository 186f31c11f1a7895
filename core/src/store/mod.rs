//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The action processor calls store methods — it never executes SQL
//! directly. All writes for one action happen inside a single
//! BEGIN IMMEDIATE transaction, so a failed action rolls back cleanly
//! and concurrent writers serialize on the row lock.

use crate::error::{GameError, GameResult};
use crate::event::{GameEvent, GameEventRow};
use crate::formulas::{BankruptcyStage, CreditHealthFactors};
use crate::game::{EntityCounters, Game};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

mod account;
mod card;
mod ledger;

pub use ledger::MonthlyReport;

pub struct GameStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// ISO date text out of a column, as rusqlite sees it.
fn parse_date(col: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    s.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_date_opt(col: usize, s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.map(|s| parse_date(col, &s)).transpose()
}

/// Entity-id counters, stored as one JSON document on the game row.
fn parse_counters(col: usize, s: &str) -> rusqlite::Result<EntityCounters> {
    serde_json::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl GameStore {
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> GameResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Unit of work ───────────────────────────────────────────

    /// Take the write lock up front so concurrent actions serialize.
    pub fn begin(&self) -> GameResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    pub fn commit(&self) -> GameResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback(&self) -> GameResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    // ── Game aggregate ─────────────────────────────────────────

    pub fn insert_game(&self, g: &Game) -> GameResult<()> {
        let counters = serde_json::to_string(&g.entity_seq)?;
        self.conn.execute(
            "INSERT INTO game (
                game_id, user_id, persona, difficulty, region, currency, date,
                level, xp, coins, happiness, net_worth, chi,
                chi_payment_history, chi_utilization, chi_account_age,
                chi_credit_mix, chi_new_inquiries,
                budget_score, streak_current, streak_longest, last_action_at,
                bankruptcy_stage, bankrupt_until, bankruptcy_count,
                consecutive_negative_months, consecutive_positive_months,
                monthly_income, pre_jobloss_income, job_recovery_on,
                last_tax_year, entity_seq, version, seed
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,
                      ?17,?18,?19,?20,?21,?22,?23,?24,?25,?26,?27,?28,?29,?30,
                      ?31,?32,?33,?34)",
            params![
                g.game_id,
                g.user_id,
                g.persona,
                g.difficulty,
                g.region,
                g.currency,
                g.date.to_string(),
                g.level as i64,
                g.xp,
                g.coins,
                g.happiness,
                g.net_worth,
                g.chi,
                g.chi_factors.payment_history,
                g.chi_factors.utilization,
                g.chi_factors.account_age,
                g.chi_factors.credit_mix,
                g.chi_factors.new_inquiries,
                g.budget_score,
                g.streak_current,
                g.streak_longest,
                g.last_action_at,
                g.bankruptcy_stage.as_str(),
                g.bankrupt_until.map(|d| d.to_string()),
                g.bankruptcy_count,
                g.consecutive_negative_months as i64,
                g.consecutive_positive_months as i64,
                g.monthly_income,
                g.pre_jobloss_income,
                g.job_recovery_on.map(|d| d.to_string()),
                g.last_tax_year,
                counters,
                g.version,
                g.seed,
            ],
        )?;
        Ok(())
    }

    pub fn load_game(&self, game_id: &str) -> GameResult<Game> {
        let result = self.conn.query_row(
            "SELECT game_id, user_id, persona, difficulty, region, currency, date,
                    level, xp, coins, happiness, net_worth, chi,
                    chi_payment_history, chi_utilization, chi_account_age,
                    chi_credit_mix, chi_new_inquiries,
                    budget_score, streak_current, streak_longest, last_action_at,
                    bankruptcy_stage, bankrupt_until, bankruptcy_count,
                    consecutive_negative_months, consecutive_positive_months,
                    monthly_income, pre_jobloss_income, job_recovery_on,
                    last_tax_year, entity_seq, version, seed
             FROM game WHERE game_id = ?1",
            params![game_id],
            |row| {
                Ok(Game {
                    game_id: row.get(0)?,
                    user_id: row.get(1)?,
                    persona: row.get(2)?,
                    difficulty: row.get(3)?,
                    region: row.get(4)?,
                    currency: row.get(5)?,
                    date: parse_date(6, &row.get::<_, String>(6)?)?,
                    level: row.get::<_, i64>(7)? as u32,
                    xp: row.get(8)?,
                    coins: row.get(9)?,
                    happiness: row.get(10)?,
                    net_worth: row.get(11)?,
                    chi: row.get(12)?,
                    chi_factors: CreditHealthFactors {
                        payment_history: row.get(13)?,
                        utilization: row.get(14)?,
                        account_age: row.get(15)?,
                        credit_mix: row.get(16)?,
                        new_inquiries: row.get(17)?,
                    },
                    budget_score: row.get(18)?,
                    streak_current: row.get(19)?,
                    streak_longest: row.get(20)?,
                    last_action_at: row.get(21)?,
                    bankruptcy_stage: BankruptcyStage::parse(&row.get::<_, String>(22)?),
                    bankrupt_until: parse_date_opt(23, row.get(23)?)?,
                    bankruptcy_count: row.get(24)?,
                    consecutive_negative_months: row.get::<_, i64>(25)? as u32,
                    consecutive_positive_months: row.get::<_, i64>(26)? as u32,
                    monthly_income: row.get(27)?,
                    pre_jobloss_income: row.get(28)?,
                    job_recovery_on: parse_date_opt(29, row.get(29)?)?,
                    last_tax_year: row.get(30)?,
                    entity_seq: parse_counters(31, &row.get::<_, String>(31)?)?,
                    version: row.get(32)?,
                    seed: row.get(33)?,
                })
            },
        );
        match result {
            Ok(game) => Ok(game),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(GameError::GameNotFound(game_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the mutated aggregate with an optimistic version check.
    /// `g.version` must hold the version that was loaded; the row's
    /// version is bumped by one iff it still matches, otherwise this is
    /// a `VersionConflict` and nothing is written.
    pub fn update_game(&self, g: &Game) -> GameResult<()> {
        let counters = serde_json::to_string(&g.entity_seq)?;
        let affected = self.conn.execute(
            "UPDATE game SET
                date = ?1, level = ?2, xp = ?3, coins = ?4, happiness = ?5,
                net_worth = ?6, chi = ?7,
                chi_payment_history = ?8, chi_utilization = ?9,
                chi_account_age = ?10, chi_credit_mix = ?11,
                chi_new_inquiries = ?12,
                budget_score = ?13, streak_current = ?14, streak_longest = ?15,
                last_action_at = ?16, bankruptcy_stage = ?17,
                bankrupt_until = ?18, bankruptcy_count = ?19,
                consecutive_negative_months = ?20,
                consecutive_positive_months = ?21,
                monthly_income = ?22, pre_jobloss_income = ?23,
                job_recovery_on = ?24, last_tax_year = ?25, entity_seq = ?26,
                version = version + 1
             WHERE game_id = ?27 AND version = ?28",
            params![
                g.date.to_string(),
                g.level as i64,
                g.xp,
                g.coins,
                g.happiness,
                g.net_worth,
                g.chi,
                g.chi_factors.payment_history,
                g.chi_factors.utilization,
                g.chi_factors.account_age,
                g.chi_factors.credit_mix,
                g.chi_factors.new_inquiries,
                g.budget_score,
                g.streak_current,
                g.streak_longest,
                g.last_action_at,
                g.bankruptcy_stage.as_str(),
                g.bankrupt_until.map(|d| d.to_string()),
                g.bankruptcy_count,
                g.consecutive_negative_months as i64,
                g.consecutive_positive_months as i64,
                g.monthly_income,
                g.pre_jobloss_income,
                g.job_recovery_on.map(|d| d.to_string()),
                g.last_tax_year,
                counters,
                g.game_id,
                g.version,
            ],
        )?;
        if affected != 1 {
            return Err(GameError::VersionConflict {
                game_id: g.game_id.clone(),
                expected: g.version,
            });
        }
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, game_id: &str, date: NaiveDate, event: &GameEvent) -> GameResult<()> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO game_event (game_id, date, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![game_id, date.to_string(), event.type_name(), payload],
        )?;
        Ok(())
    }

    pub fn events_for_game(&self, game_id: &str) -> GameResult<Vec<GameEventRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, game_id, date, event_type, payload
             FROM game_event WHERE game_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![game_id], |row| {
                Ok(GameEventRow {
                    id: Some(row.get(0)?),
                    game_id: row.get(1)?,
                    date: parse_date(2, &row.get::<_, String>(2)?)?,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn event_count(&self, game_id: &str, event_type: &str) -> GameResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM game_event WHERE game_id = ?1 AND event_type = ?2",
                params![game_id, event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
