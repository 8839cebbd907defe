use super::LedgerStore;
use crate::{
    contribution::Contribution,
    error::LedgerResult,
    types::{timestamp_to_sql, AccountId, CycleNumber},
};
use rusqlite::{params, OptionalExtension};

impl LedgerStore {
    // ── Contribution ──────────────────────────────────────────────

    pub fn insert_contribution(&self, c: &Contribution) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO contribution (group_id, account_id, cycle_number, amount, contributed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                c.group_id,
                c.account_id,
                c.cycle_number as i64,
                c.amount,
                timestamp_to_sql(&c.contributed_at),
            ],
        )?;
        Ok(())
    }

    pub fn contribution_exists(
        &self,
        group_id: &str,
        account_id: &str,
        cycle: CycleNumber,
    ) -> LedgerResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM contribution
                 WHERE group_id = ?1 AND account_id = ?2 AND cycle_number = ?3",
                params![group_id, account_id, cycle as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn contributors(&self, group_id: &str, cycle: CycleNumber) -> LedgerResult<Vec<AccountId>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id FROM contribution
             WHERE group_id = ?1 AND cycle_number = ?2
             ORDER BY contributed_at ASC",
        )?;
        let rows = stmt.query_map(params![group_id, cycle as i64], |row| {
            row.get::<_, AccountId>(0)
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn contribution_count(&self, group_id: &str, account_id: &str) -> LedgerResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM contribution WHERE group_id = ?1 AND account_id = ?2",
            params![group_id, account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
