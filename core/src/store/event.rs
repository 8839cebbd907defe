use super::{read_timestamp, LedgerStore};
use crate::{error::LedgerResult, event::EventLogEntry, types::timestamp_to_sql};
use rusqlite::params;

impl LedgerStore {
    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> LedgerResult<i64> {
        self.conn.execute(
            "INSERT INTO event_log (event_type, payload, created_at) VALUES (?1, ?2, ?3)",
            params![
                entry.event_type,
                entry.payload,
                timestamp_to_sql(&entry.created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Events in commit order (oldest first), at most `limit`.
    pub fn events(&self, limit: u32) -> LedgerResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, payload, created_at
             FROM event_log ORDER BY id ASC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload:    row.get(2)?,
                    created_at: read_timestamp(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> LedgerResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
