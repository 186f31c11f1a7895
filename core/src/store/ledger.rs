//! Progression ledgers: XP, coins, monthly reports, badges, shields.

use super::{parse_date, GameStore};
use crate::error::GameResult;
use crate::types::Cents;
use chrono::NaiveDate;
use rusqlite::params;
use std::collections::HashSet;

/// One month-end summary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyReport {
    pub game_id: String,
    pub month: String,
    pub net_worth: Cents,
    pub income: Cents,
    pub expenses: Cents,
    pub chi: i64,
    pub budget_score: i64,
    pub created_on: NaiveDate,
}

impl GameStore {
    // ── XP / coin ledgers ──────────────────────────────────────

    pub fn append_xp(
        &self,
        game_id: &str,
        user_id: &str,
        date: NaiveDate,
        amount: i64,
        reason: &str,
        balance_after: i64,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO xp_ledger (game_id, user_id, date, amount, reason, balance_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![game_id, user_id, date.to_string(), amount, reason, balance_after],
        )?;
        Ok(())
    }

    pub fn append_coins(
        &self,
        game_id: &str,
        user_id: &str,
        date: NaiveDate,
        amount: i64,
        reason: &str,
        balance_after: i64,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO coin_ledger (game_id, user_id, date, amount, reason, balance_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![game_id, user_id, date.to_string(), amount, reason, balance_after],
        )?;
        Ok(())
    }

    pub fn xp_ledger_sum(&self, game_id: &str) -> GameResult<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM xp_ledger WHERE game_id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn coin_ledger_sum(&self, game_id: &str) -> GameResult<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM coin_ledger WHERE game_id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Monthly reports ────────────────────────────────────────

    pub fn upsert_monthly_report(&self, r: &MonthlyReport) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO monthly_report (
                game_id, month, net_worth, income, expenses, chi,
                budget_score, created_on
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
            ON CONFLICT(game_id, month) DO UPDATE SET
                net_worth = excluded.net_worth,
                income = excluded.income,
                expenses = excluded.expenses,
                chi = excluded.chi,
                budget_score = excluded.budget_score",
            params![
                r.game_id,
                r.month,
                r.net_worth,
                r.income,
                r.expenses,
                r.chi,
                r.budget_score,
                r.created_on.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn monthly_reports(&self, game_id: &str) -> GameResult<Vec<MonthlyReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, month, net_worth, income, expenses, chi,
                    budget_score, created_on
             FROM monthly_report WHERE game_id = ?1
             ORDER BY month ASC",
        )?;
        let rows = stmt
            .query_map(params![game_id], |row| {
                Ok(MonthlyReport {
                    game_id: row.get(0)?,
                    month: row.get(1)?,
                    net_worth: row.get(2)?,
                    income: row.get(3)?,
                    expenses: row.get(4)?,
                    chi: row.get(5)?,
                    budget_score: row.get(6)?,
                    created_on: parse_date(7, &row.get::<_, String>(7)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Badges ─────────────────────────────────────────────────

    pub fn insert_earned_badge(
        &self,
        game_id: &str,
        badge_id: &str,
        earned_on: NaiveDate,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO earned_badge (game_id, badge_id, earned_on)
             VALUES (?1, ?2, ?3)",
            params![game_id, badge_id, earned_on.to_string()],
        )?;
        Ok(())
    }

    pub fn earned_badges(&self, game_id: &str) -> GameResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT badge_id FROM earned_badge WHERE game_id = ?1")?;
        let rows = stmt
            .query_map(params![game_id], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(rows)
    }

    // ── Streak ticks ───────────────────────────────────────────

    /// Most recent streak-tick count for one metric, derived from the
    /// event log rather than a separate counter table.
    pub fn last_streak_tick(&self, game_id: &str, metric: &str) -> GameResult<Option<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT json_extract(payload, '$.count') FROM game_event
             WHERE game_id = ?1 AND event_type = 'streak_tick'
               AND json_extract(payload, '$.metric') = ?2
             ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![game_id, metric])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    // ── Streak shields ─────────────────────────────────────────

    pub fn grant_streak_shield(
        &self,
        game_id: &str,
        granted_on: NaiveDate,
        source: &str,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO streak_shield (game_id, granted_on, source)
             VALUES (?1, ?2, ?3)",
            params![game_id, granted_on.to_string(), source],
        )?;
        Ok(())
    }

    /// Spend the oldest shield. Returns false when none are banked.
    /// This is the one write path in the schema that deletes a row.
    pub fn consume_streak_shield(&self, game_id: &str) -> GameResult<bool> {
        let affected = self.conn.execute(
            "DELETE FROM streak_shield WHERE id = (
                SELECT id FROM streak_shield WHERE game_id = ?1
                ORDER BY id ASC LIMIT 1
            )",
            params![game_id],
        )?;
        Ok(affected > 0)
    }

    pub fn streak_shield_count(&self, game_id: &str) -> GameResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM streak_shield WHERE game_id = ?1",
                params![game_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
