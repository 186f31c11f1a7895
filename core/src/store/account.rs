//! Account and transaction queries.

use super::{parse_date, GameStore};
use crate::error::{GameError, GameResult};
use crate::game::{Account, AccountKind, AccountStatus, TransactionRow};
use crate::types::Cents;
use rusqlite::{params, OptionalExtension, Row};

fn account_row_mapper(row: &Row<'_>) -> rusqlite::Result<Account> {
    let kind_str: String = row.get(2)?;
    Ok(Account {
        game_id: row.get(0)?,
        account_id: row.get(1)?,
        kind: AccountKind::parse(&kind_str).unwrap_or(AccountKind::Checking),
        balance: row.get(3)?,
        interest_rate: row.get(4)?,
        credit_limit: row.get(5)?,
        principal: row.get(6)?,
        term_months: row.get(7)?,
        opened_on: parse_date(8, &row.get::<_, String>(8)?)?,
        status: AccountStatus::parse(&row.get::<_, String>(9)?),
        insurance_type: row.get(10)?,
        premium: row.get(11)?,
        deductible: row.get(12)?,
        coverage_rate: row.get(13)?,
    })
}

const ACCOUNT_COLUMNS: &str = "game_id, account_id, kind, balance, interest_rate, credit_limit,
     principal, term_months, opened_on, status,
     insurance_type, premium, deductible, coverage_rate";

impl GameStore {
    pub fn insert_account(&self, a: &Account) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO account (
                game_id, account_id, kind, balance, interest_rate, credit_limit,
                principal, term_months, opened_on, status,
                insurance_type, premium, deductible, coverage_rate
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                a.game_id,
                a.account_id,
                a.kind.as_str(),
                a.balance,
                a.interest_rate,
                a.credit_limit,
                a.principal,
                a.term_months,
                a.opened_on.to_string(),
                a.status.as_str(),
                a.insurance_type,
                a.premium,
                a.deductible,
                a.coverage_rate,
            ],
        )?;
        Ok(())
    }

    pub fn get_account(&self, game_id: &str, account_id: &str) -> GameResult<Account> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE game_id = ?1 AND account_id = ?2"
        );
        match self
            .conn
            .query_row(&sql, params![game_id, account_id], account_row_mapper)
        {
            Ok(a) => Ok(a),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(GameError::AccountNotFound(account_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All non-closed accounts, in open order.
    pub fn open_accounts(&self, game_id: &str) -> GameResult<Vec<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE game_id = ?1 AND status != 'closed'
             ORDER BY account_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![game_id], account_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// First active account of `kind`, if any.
    pub fn active_account_of_kind(
        &self,
        game_id: &str,
        kind: AccountKind,
    ) -> GameResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE game_id = ?1 AND kind = ?2 AND status = 'active'
             ORDER BY account_id ASC LIMIT 1"
        );
        let result = self
            .conn
            .query_row(&sql, params![game_id, kind.as_str()], account_row_mapper)
            .optional()?;
        Ok(result)
    }

    /// The account cash postings land on: checking, falling back to
    /// prepaid, then savings. Frozen accounts never qualify.
    pub fn primary_liquid_account(&self, game_id: &str) -> GameResult<Account> {
        for kind in [AccountKind::Checking, AccountKind::Prepaid, AccountKind::Savings] {
            if let Some(account) = self.active_account_of_kind(game_id, kind)? {
                return Ok(account);
            }
        }
        Err(GameError::NoChecking)
    }

    /// The active policy account for an insurance type, if one exists.
    pub fn active_policy(&self, game_id: &str, insurance_type: &str) -> GameResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE game_id = ?1 AND kind = 'insurance' AND status = 'active'
               AND insurance_type = ?2
             LIMIT 1"
        );
        let result = self
            .conn
            .query_row(&sql, params![game_id, insurance_type], account_row_mapper)
            .optional()?;
        Ok(result)
    }

    pub fn update_balance(&self, game_id: &str, account_id: &str, delta: Cents) -> GameResult<()> {
        let affected = self.conn.execute(
            "UPDATE account SET balance = balance + ?1
             WHERE game_id = ?2 AND account_id = ?3",
            params![delta, game_id, account_id],
        )?;
        if affected != 1 {
            return Err(GameError::AccountNotFound(account_id.to_string()));
        }
        Ok(())
    }

    pub fn set_account_status(
        &self,
        game_id: &str,
        account_id: &str,
        status: AccountStatus,
    ) -> GameResult<()> {
        self.conn.execute(
            "UPDATE account SET status = ?1 WHERE game_id = ?2 AND account_id = ?3",
            params![status.as_str(), game_id, account_id],
        )?;
        Ok(())
    }

    /// Freeze investment and credit-card accounts on bankruptcy entry.
    /// Returns how many accounts were frozen.
    pub fn freeze_for_bankruptcy(&self, game_id: &str) -> GameResult<usize> {
        let affected = self.conn.execute(
            "UPDATE account SET status = 'frozen'
             WHERE game_id = ?1 AND status = 'active'
               AND kind IN ('investment', 'credit_card')",
            params![game_id],
        )?;
        Ok(affected)
    }

    pub fn unfreeze_all(&self, game_id: &str) -> GameResult<usize> {
        let affected = self.conn.execute(
            "UPDATE account SET status = 'active'
             WHERE game_id = ?1 AND status = 'frozen'",
            params![game_id],
        )?;
        Ok(affected)
    }

    /// Signed sum of balances across non-closed accounts. Debt accounts
    /// carry negative balances, so this is net worth directly.
    pub fn net_worth(&self, game_id: &str) -> GameResult<Cents> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(balance), 0) FROM account
                 WHERE game_id = ?1 AND status != 'closed'",
                params![game_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Transactions ───────────────────────────────────────────

    pub fn insert_transaction(&self, t: &TransactionRow) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO txn (
                game_id, txn_id, account_id, date, category, amount,
                balance_after, description, source_card, automated
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                t.game_id,
                t.txn_id,
                t.account_id,
                t.date.to_string(),
                t.category,
                t.amount,
                t.balance_after,
                t.description,
                t.source_card,
                t.automated as i64,
            ],
        )?;
        Ok(())
    }

    pub fn transactions_for_account(
        &self,
        game_id: &str,
        account_id: &str,
    ) -> GameResult<Vec<TransactionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, txn_id, account_id, date, category, amount,
                    balance_after, description, source_card, automated
             FROM txn WHERE game_id = ?1 AND account_id = ?2
             ORDER BY txn_id ASC",
        )?;
        let rows = stmt
            .query_map(params![game_id, account_id], |row| {
                Ok(TransactionRow {
                    game_id: row.get(0)?,
                    txn_id: row.get(1)?,
                    account_id: row.get(2)?,
                    date: parse_date(3, &row.get::<_, String>(3)?)?,
                    category: row.get(4)?,
                    amount: row.get(5)?,
                    balance_after: row.get(6)?,
                    description: row.get(7)?,
                    source_card: row.get(8)?,
                    automated: row.get::<_, i64>(9)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Spending per category for one `YYYY-MM` month. Transfers are
    /// internal moves and never count as spending.
    pub fn month_spend_by_category(
        &self,
        game_id: &str,
        month: &str,
    ) -> GameResult<Vec<(String, Cents)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, SUM(-amount) FROM txn
             WHERE game_id = ?1 AND date LIKE ?2 AND amount < 0
               AND category != 'transfer'
             GROUP BY category",
        )?;
        let pattern = format!("{month}%");
        let rows = stmt
            .query_map(params![game_id, pattern], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Cents>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Gross inflow for one month, excluding internal transfers.
    pub fn month_income(&self, game_id: &str, month: &str) -> GameResult<Cents> {
        let pattern = format!("{month}%");
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM txn
                 WHERE game_id = ?1 AND date LIKE ?2 AND amount > 0
                   AND category != 'transfer'",
                params![game_id, pattern],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Gross outflow for one month, excluding internal transfers.
    pub fn month_expenses(&self, game_id: &str, month: &str) -> GameResult<Cents> {
        let pattern = format!("{month}%");
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(-amount), 0) FROM txn
                 WHERE game_id = ?1 AND date LIKE ?2 AND amount < 0
                   AND category != 'transfer'",
                params![game_id, pattern],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Accounts opened during one `YYYY-MM` month (feeds the
    /// new-inquiries credit factor).
    pub fn accounts_opened_in_month(&self, game_id: &str, month: &str) -> GameResult<i64> {
        let pattern = format!("{month}%");
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM account
                 WHERE game_id = ?1 AND opened_on LIKE ?2",
                params![game_id, pattern],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
