use super::{read_enum, read_timestamp, LedgerStore};
use crate::{
    error::LedgerResult,
    transaction_log::{NewTransaction, TransactionKind, TransactionRecord},
    types::{timestamp_to_sql, Amount, Timestamp, TxnId},
};
use rusqlite::params;

impl LedgerStore {
    // ── Transaction log ───────────────────────────────────────────

    pub fn insert_txn(&self, txn: &NewTransaction, created_at: &Timestamp) -> LedgerResult<TxnId> {
        self.conn.execute(
            "INSERT INTO txn_record (account_id, kind, amount, counterparty, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                txn.account_id,
                txn.kind.as_str(),
                txn.amount,
                txn.counterparty,
                timestamp_to_sql(created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn txns_for_account(&self, account_id: &str, limit: u32) -> LedgerResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT txn_id, account_id, kind, amount, counterparty, created_at
             FROM txn_record WHERE account_id = ?1
             ORDER BY created_at DESC, txn_id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![account_id, limit as i64], |row| {
            Ok(TransactionRecord {
                txn_id:       row.get(0)?,
                account_id:   row.get(1)?,
                kind:         read_enum(row, 2)?,
                amount:       row.get(3)?,
                counterparty: row.get(4)?,
                created_at:   read_timestamp(row, 5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every (kind, amount) pair logged for the account. Summing happens in
    /// the caller: SQLite's SUM fails on i64 overflow.
    pub fn txn_amounts(&self, account_id: &str) -> LedgerResult<Vec<(TransactionKind, Amount)>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, amount FROM txn_record
             WHERE account_id = ?1 ORDER BY txn_id ASC",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok((read_enum::<TransactionKind>(row, 0)?, row.get::<_, Amount>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn txn_count(&self) -> LedgerResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM txn_record", [], |row| row.get(0))?;
        Ok(count)
    }
}
