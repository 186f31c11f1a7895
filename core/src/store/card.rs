//! Decision-card, scheduled-card, bill, and budget queries.

use super::{parse_date, GameStore};
use crate::cards::{CardOption, CardStatus, PendingCard, ScheduledCard};
use crate::error::{GameError, GameResult};
use crate::event::BudgetAllocation;
use crate::game::{BillFrequency, ScheduledBill};
use chrono::NaiveDate;
use rusqlite::{params, Row};

fn pending_card_mapper(row: &Row<'_>) -> rusqlite::Result<PendingCard> {
    let options_json: String = row.get(9)?;
    let options: Vec<CardOption> = serde_json::from_str(&options_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PendingCard {
        game_id: row.get(0)?,
        card_id: row.get(1)?,
        template_id: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        presented_on: parse_date(5, &row.get::<_, String>(5)?)?,
        expires_on: parse_date(6, &row.get::<_, String>(6)?)?,
        status: CardStatus::parse(&row.get::<_, String>(7)?),
        chosen_option: row.get(8)?,
        options,
    })
}

const PENDING_CARD_COLUMNS: &str = "game_id, card_id, template_id, category, description,
     presented_on, expires_on, status, chosen_option, options_json";

impl GameStore {
    pub fn insert_pending_card(&self, c: &PendingCard) -> GameResult<()> {
        let options_json = serde_json::to_string(&c.options)?;
        self.conn.execute(
            "INSERT INTO pending_card (
                game_id, card_id, template_id, category, description,
                presented_on, expires_on, status, chosen_option, options_json
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                c.game_id,
                c.card_id,
                c.template_id,
                c.category,
                c.description,
                c.presented_on.to_string(),
                c.expires_on.to_string(),
                c.status.as_str(),
                c.chosen_option,
                options_json,
            ],
        )?;
        Ok(())
    }

    /// Fetch a card still awaiting a decision. Resolved or unknown cards
    /// both surface as `CardNotFound`.
    pub fn get_pending_card(&self, game_id: &str, card_id: &str) -> GameResult<PendingCard> {
        let sql = format!(
            "SELECT {PENDING_CARD_COLUMNS} FROM pending_card
             WHERE game_id = ?1 AND card_id = ?2 AND status = 'pending'"
        );
        match self
            .conn
            .query_row(&sql, params![game_id, card_id], pending_card_mapper)
        {
            Ok(c) => Ok(c),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(GameError::CardNotFound(card_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn pending_cards(&self, game_id: &str) -> GameResult<Vec<PendingCard>> {
        let sql = format!(
            "SELECT {PENDING_CARD_COLUMNS} FROM pending_card
             WHERE game_id = ?1 AND status = 'pending'
             ORDER BY card_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![game_id], pending_card_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn pending_card_count(&self, game_id: &str) -> GameResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pending_card WHERE game_id = ?1 AND status = 'pending'",
            params![game_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn resolve_card(&self, game_id: &str, card_id: &str, option_id: &str) -> GameResult<()> {
        let affected = self.conn.execute(
            "UPDATE pending_card SET status = 'resolved', chosen_option = ?1
             WHERE game_id = ?2 AND card_id = ?3 AND status = 'pending'",
            params![option_id, game_id, card_id],
        )?;
        if affected != 1 {
            return Err(GameError::CardNotFound(card_id.to_string()));
        }
        Ok(())
    }

    pub fn resolved_card_count(&self, game_id: &str) -> GameResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM pending_card
                 WHERE game_id = ?1 AND status = 'resolved'",
                params![game_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Template ids presented on or after `since` (recency filter input).
    pub fn recent_template_ids(&self, game_id: &str, since: NaiveDate) -> GameResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT template_id FROM pending_card
             WHERE game_id = ?1 AND presented_on >= ?2",
        )?;
        let rows = stmt
            .query_map(params![game_id, since.to_string()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Scheduled cards ────────────────────────────────────────

    pub fn insert_scheduled_card(&self, s: &ScheduledCard) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO scheduled_card (game_id, sched_id, template_id, due_on, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.game_id, s.sched_id, s.template_id, s.due_on.to_string(), s.source],
        )?;
        Ok(())
    }

    /// Unpresented scheduled cards whose due date has arrived.
    pub fn due_scheduled_cards(&self, game_id: &str, on: NaiveDate) -> GameResult<Vec<ScheduledCard>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, sched_id, template_id, due_on, source
             FROM scheduled_card
             WHERE game_id = ?1 AND presented = 0 AND due_on <= ?2
             ORDER BY sched_id ASC",
        )?;
        let rows = stmt
            .query_map(params![game_id, on.to_string()], |row| {
                Ok(ScheduledCard {
                    game_id: row.get(0)?,
                    sched_id: row.get(1)?,
                    template_id: row.get(2)?,
                    due_on: parse_date(3, &row.get::<_, String>(3)?)?,
                    source: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn mark_scheduled_card_presented(&self, game_id: &str, sched_id: &str) -> GameResult<()> {
        self.conn.execute(
            "UPDATE scheduled_card SET presented = 1
             WHERE game_id = ?1 AND sched_id = ?2",
            params![game_id, sched_id],
        )?;
        Ok(())
    }

    // ── Bills ──────────────────────────────────────────────────

    pub fn insert_bill(&self, b: &ScheduledBill) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO scheduled_bill (
                game_id, bill_id, name, category, amount, frequency,
                next_due_on, autopay
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                b.game_id,
                b.bill_id,
                b.name,
                b.category,
                b.amount,
                b.frequency.as_str(),
                b.next_due_on.to_string(),
                b.autopay as i64,
            ],
        )?;
        Ok(())
    }

    fn bill_mapper(row: &Row<'_>) -> rusqlite::Result<ScheduledBill> {
        Ok(ScheduledBill {
            game_id: row.get(0)?,
            bill_id: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            frequency: BillFrequency::parse(&row.get::<_, String>(5)?),
            next_due_on: parse_date(6, &row.get::<_, String>(6)?)?,
            autopay: row.get::<_, i64>(7)? != 0,
        })
    }

    pub fn bills(&self, game_id: &str) -> GameResult<Vec<ScheduledBill>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, bill_id, name, category, amount, frequency,
                    next_due_on, autopay
             FROM scheduled_bill WHERE game_id = ?1
             ORDER BY bill_id ASC",
        )?;
        let rows = stmt.query_map(params![game_id], Self::bill_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Autopay bills due on or before `date`, in bill-id order.
    pub fn bills_due(&self, game_id: &str, date: NaiveDate) -> GameResult<Vec<ScheduledBill>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, bill_id, name, category, amount, frequency,
                    next_due_on, autopay
             FROM scheduled_bill
             WHERE game_id = ?1 AND autopay = 1 AND next_due_on <= ?2
             ORDER BY bill_id ASC",
        )?;
        let rows = stmt.query_map(params![game_id, date.to_string()], Self::bill_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn advance_bill(&self, game_id: &str, bill_id: &str, next_due: NaiveDate) -> GameResult<()> {
        self.conn.execute(
            "UPDATE scheduled_bill SET next_due_on = ?1
             WHERE game_id = ?2 AND bill_id = ?3",
            params![next_due.to_string(), game_id, bill_id],
        )?;
        Ok(())
    }

    pub fn update_bill_amount(&self, game_id: &str, bill_id: &str, amount: i64) -> GameResult<()> {
        self.conn.execute(
            "UPDATE scheduled_bill SET amount = ?1
             WHERE game_id = ?2 AND bill_id = ?3",
            params![amount, game_id, bill_id],
        )?;
        Ok(())
    }

    pub fn bills_in_category(&self, game_id: &str, category: &str) -> GameResult<Vec<ScheduledBill>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, bill_id, name, category, amount, frequency,
                    next_due_on, autopay
             FROM scheduled_bill
             WHERE game_id = ?1 AND category = ?2
             ORDER BY bill_id ASC",
        )?;
        let rows = stmt.query_map(params![game_id, category], Self::bill_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Budget allocations ─────────────────────────────────────

    /// Replace the full allocation set atomically (settings table, not a
    /// ledger).
    pub fn replace_budget_allocations(
        &self,
        game_id: &str,
        allocations: &[BudgetAllocation],
    ) -> GameResult<()> {
        self.conn.execute(
            "DELETE FROM budget_allocation WHERE game_id = ?1",
            params![game_id],
        )?;
        for a in allocations {
            self.conn.execute(
                "INSERT INTO budget_allocation (game_id, category, amount)
                 VALUES (?1, ?2, ?3)",
                params![game_id, a.category, a.amount],
            )?;
        }
        Ok(())
    }

    pub fn budget_allocations(&self, game_id: &str) -> GameResult<Vec<BudgetAllocation>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, amount FROM budget_allocation
             WHERE game_id = ?1 ORDER BY category ASC",
        )?;
        let rows = stmt
            .query_map(params![game_id], |row| {
                Ok(BudgetAllocation {
                    category: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
