use super::{read_timestamp, LedgerStore};
use crate::{
    account::Account,
    error::LedgerResult,
    types::{timestamp_to_sql, Amount},
};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Account ───────────────────────────────────────────────────

    pub fn insert_account(&self, account: &Account) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO account (account_id, balance, opening_balance, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                account.account_id,
                account.balance,
                account.opening_balance,
                timestamp_to_sql(&account.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn account_exists(&self, account_id: &str) -> LedgerResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM account WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT account_id, balance, opening_balance, created_at
                 FROM account WHERE account_id = ?1",
                params![account_id],
                |row| {
                    Ok(Account {
                        account_id:      row.get(0)?,
                        balance:         row.get(1)?,
                        opening_balance: row.get(2)?,
                        created_at:      read_timestamp(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    pub fn all_accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, balance, opening_balance, created_at
             FROM account ORDER BY account_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Account {
                account_id:      row.get(0)?,
                balance:         row.get(1)?,
                opening_balance: row.get(2)?,
                created_at:      read_timestamp(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn account_balance(&self, account_id: &str) -> LedgerResult<Option<Amount>> {
        let balance = self
            .conn
            .query_row(
                "SELECT balance FROM account WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance)
    }

    pub fn set_account_balance(&self, account_id: &str, balance: Amount) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE account SET balance = ?1 WHERE account_id = ?2",
            params![balance, account_id],
        )?;
        Ok(())
    }
}
